//! Contracts for the collaborators the session engine relies on.
//!
//! The engine itself only ever sees in-memory snapshots; storage, identity,
//! text extraction and confirmation prompts are provided from outside.

use crate::error::{ExtractError, StoreError};
use crate::models::{CardDraft, CardId, Direction, Flashcard, Lesson, LessonId, UserId, Visibility};
use crate::quiz::QuizOutcome;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crossbeam_channel::Receiver;
use std::path::Path;

pub type StoreResult<T> = Result<T, StoreError>;

/// Whose lessons a query covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerScope {
    /// Only lessons owned by the user.
    Owned(UserId),
    /// The user's lessons plus every shared lesson.
    Visible(UserId),
}

impl OwnerScope {
    pub fn user(&self) -> &UserId {
        match self {
            OwnerScope::Owned(user) | OwnerScope::Visible(user) => user,
        }
    }
}

/// Lessons and flashcards in a scope at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibrarySnapshot {
    pub lessons: Vec<Lesson>,
    pub flashcards: Vec<Flashcard>,
}

pub trait LibraryStore {
    fn list_lessons(&self, scope: &OwnerScope) -> StoreResult<Vec<Lesson>>;

    fn list_flashcards(&self, scope: &OwnerScope) -> StoreResult<Vec<Flashcard>>;

    fn create_lesson(&self, owner: &UserId, name: &str, visibility: Visibility)
    -> StoreResult<Lesson>;

    /// The card takes the visibility of its lesson.
    fn create_flashcard(
        &self,
        owner: &UserId,
        lesson: LessonId,
        draft: &CardDraft,
    ) -> StoreResult<Flashcard>;

    /// All or nothing.
    fn bulk_create_flashcards(
        &self,
        owner: &UserId,
        lesson: LessonId,
        drafts: &[CardDraft],
    ) -> StoreResult<Vec<Flashcard>>;

    /// Change who can see a lesson and its cards.
    fn set_lesson_visibility(
        &self,
        owner: &UserId,
        lesson: LessonId,
        visibility: Visibility,
    ) -> StoreResult<()>;

    /// Delete a lesson and its flashcards. Returns the number of cards removed.
    fn delete_lesson(&self, owner: &UserId, lesson: LessonId) -> StoreResult<usize>;

    fn delete_flashcard(&self, owner: &UserId, card: CardId) -> StoreResult<()>;

    /// Receive a snapshot of `scope` now and after every change.
    fn subscribe(&self, scope: OwnerScope) -> StoreResult<Receiver<LibrarySnapshot>>;
}

/// One finished quiz as kept in history.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub id: i64,
    pub owner: UserId,
    pub direction: Direction,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: QuizOutcome,
}

pub trait SessionHistory {
    fn record_session(
        &self,
        owner: &UserId,
        direction: Direction,
        started_at: DateTime<Utc>,
        outcome: &QuizOutcome,
    ) -> StoreResult<i64>;

    /// Most recent first.
    fn recent_sessions(&self, owner: &UserId, limit: usize) -> StoreResult<Vec<SessionRecord>>;

    fn last_session(&self, owner: &UserId) -> StoreResult<Option<SessionRecord>>;
}

/// Turns an image into free-form text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, image: &Path) -> Result<String, ExtractError>;
}

pub trait AuthProvider {
    fn current_user(&self) -> Option<UserId>;
}

/// Identity fixed at startup, e.g. from the config file.
#[derive(Debug, Clone)]
pub struct StaticIdentity(Option<UserId>);

impl StaticIdentity {
    pub fn new(user: Option<UserId>) -> Self {
        Self(user)
    }
}

impl AuthProvider for StaticIdentity {
    fn current_user(&self) -> Option<UserId> {
        self.0.clone()
    }
}

/// Asks the user to confirm a destructive action.
pub trait Confirm {
    fn confirm(&self, message: &str) -> bool;
}

/// Confirms everything, for `--yes` style flags.
#[derive(Debug, Clone, Copy)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _message: &str) -> bool {
        true
    }
}
