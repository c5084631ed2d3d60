use crate::error::StoreError;
use crate::models::{CardDraft, CardId, Direction, Flashcard, Lesson, LessonId, UserId, Visibility};
use crate::ports::{
    LibrarySnapshot, LibraryStore, OwnerScope, SessionHistory, SessionRecord, StoreResult,
};
use crate::quiz::QuizOutcome;
use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, Sender};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod flashcard;
pub mod lesson;
pub mod session;

mod embedded {
    refinery::embed_migrations!("migrations");
}

pub fn get_data_dir() -> PathBuf {
    if cfg!(target_os = "windows") {
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| "C:\\Users\\User".to_string());
        PathBuf::from(home).join(".local\\share\\vocab-flashcards")
    } else {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/home/user".to_string());
        PathBuf::from(home).join(".local/share/vocab-flashcards")
    }
}

pub fn get_db_path() -> PathBuf {
    get_data_dir().join("vocab.db")
}

pub(crate) fn run_migrations(conn: &mut Connection) -> Result<(), StoreError> {
    let report = embedded::migrations::runner().run(conn)?;
    for migration in report.applied_migrations() {
        log::debug!("Applied migration {}", migration);
    }
    Ok(())
}

/// Current time at the precision stored in the database.
pub(crate) fn now() -> DateTime<Utc> {
    timestamp(Utc::now().timestamp())
}

pub(crate) fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

struct Subscriber {
    scope: OwnerScope,
    tx: Sender<LibrarySnapshot>,
}

/// Lessons, flashcards and quiz history in a local SQLite file.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        log::debug!("Opening database at {}", path.display());
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> StoreResult<Self> {
        run_migrations(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            subscribers: Mutex::new(Vec::new()),
        })
    }

    fn acquire(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self, scope: &OwnerScope) -> StoreResult<LibrarySnapshot> {
        let conn = self.acquire();
        Ok(LibrarySnapshot {
            lessons: lesson::list_lessons(&conn, scope)?,
            flashcards: flashcard::list_flashcards(&conn, scope)?,
        })
    }

    /// Push fresh snapshots to every live subscriber. Must be called without
    /// holding the connection lock.
    fn notify(&self) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|subscriber| match self.snapshot(&subscriber.scope) {
            Ok(snapshot) => subscriber.tx.send(snapshot).is_ok(),
            Err(e) => {
                log::error!("Failed to refresh subscriber snapshot: {}", e);
                true
            }
        });
    }

    fn owned_lesson(conn: &Connection, owner: &UserId, id: LessonId) -> StoreResult<Lesson> {
        let lesson = lesson::get_lesson(conn, id)?.ok_or(StoreError::LessonNotFound(id))?;
        if &lesson.owner != owner {
            return Err(StoreError::NotOwner);
        }
        Ok(lesson)
    }
}

fn validate_draft(draft: &CardDraft) -> StoreResult<CardDraft> {
    let front = draft.front.trim();
    let back = draft.back.trim();
    if front.is_empty() || back.is_empty() {
        return Err(StoreError::InvalidCard(
            "front and back must not be empty".to_string(),
        ));
    }
    Ok(CardDraft::new(front, back))
}

impl LibraryStore for SqliteStore {
    fn list_lessons(&self, scope: &OwnerScope) -> StoreResult<Vec<Lesson>> {
        Ok(lesson::list_lessons(&self.acquire(), scope)?)
    }

    fn list_flashcards(&self, scope: &OwnerScope) -> StoreResult<Vec<Flashcard>> {
        Ok(flashcard::list_flashcards(&self.acquire(), scope)?)
    }

    fn create_lesson(
        &self,
        owner: &UserId,
        name: &str,
        visibility: Visibility,
    ) -> StoreResult<Lesson> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::EmptyLessonName);
        }
        let lesson = lesson::insert_lesson(&self.acquire(), owner, name, visibility)?;
        log::info!("Created lesson {} ({})", lesson.id, lesson.name);
        self.notify();
        Ok(lesson)
    }

    fn create_flashcard(
        &self,
        owner: &UserId,
        lesson: LessonId,
        draft: &CardDraft,
    ) -> StoreResult<Flashcard> {
        let draft = validate_draft(draft)?;
        let card = {
            let conn = self.acquire();
            let lesson = Self::owned_lesson(&conn, owner, lesson)?;
            flashcard::insert_flashcard(&conn, &lesson, &draft)?
        };
        self.notify();
        Ok(card)
    }

    fn bulk_create_flashcards(
        &self,
        owner: &UserId,
        lesson: LessonId,
        drafts: &[CardDraft],
    ) -> StoreResult<Vec<Flashcard>> {
        let drafts = drafts
            .iter()
            .map(validate_draft)
            .collect::<StoreResult<Vec<_>>>()?;
        let cards = {
            let mut conn = self.acquire();
            let tx = conn.transaction()?;
            let lesson = Self::owned_lesson(&tx, owner, lesson)?;
            let mut cards = Vec::with_capacity(drafts.len());
            for draft in &drafts {
                cards.push(flashcard::insert_flashcard(&tx, &lesson, draft)?);
            }
            tx.commit()?;
            cards
        };
        log::info!("Added {} flashcards to lesson {}", cards.len(), lesson);
        self.notify();
        Ok(cards)
    }

    fn set_lesson_visibility(
        &self,
        owner: &UserId,
        lesson: LessonId,
        visibility: Visibility,
    ) -> StoreResult<()> {
        {
            let mut conn = self.acquire();
            let tx = conn.transaction()?;
            Self::owned_lesson(&tx, owner, lesson)?;
            lesson::update_visibility(&tx, lesson, visibility)?;
            tx.commit()?;
        }
        log::info!("Lesson {} is now {}", lesson, visibility.as_str());
        self.notify();
        Ok(())
    }

    fn delete_lesson(&self, owner: &UserId, lesson: LessonId) -> StoreResult<usize> {
        let removed = {
            let mut conn = self.acquire();
            let tx = conn.transaction()?;
            Self::owned_lesson(&tx, owner, lesson)?;
            let removed = lesson::delete_lesson(&tx, lesson)?;
            tx.commit()?;
            removed
        };
        log::info!("Deleted lesson {} and {} flashcards", lesson, removed);
        self.notify();
        Ok(removed)
    }

    fn delete_flashcard(&self, owner: &UserId, card: CardId) -> StoreResult<()> {
        {
            let conn = self.acquire();
            let existing =
                flashcard::get_flashcard(&conn, card)?.ok_or(StoreError::CardNotFound(card))?;
            if &existing.owner != owner {
                return Err(StoreError::NotOwner);
            }
            flashcard::delete_flashcard(&conn, card)?;
        }
        log::info!("Deleted flashcard {}", card);
        self.notify();
        Ok(())
    }

    fn subscribe(&self, scope: OwnerScope) -> StoreResult<Receiver<LibrarySnapshot>> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let initial = self.snapshot(&scope)?;
        // The receiver is still alive, so the first send cannot fail.
        let _ = tx.send(initial);
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscriber { scope, tx });
        Ok(rx)
    }
}

impl SessionHistory for SqliteStore {
    fn record_session(
        &self,
        owner: &UserId,
        direction: Direction,
        started_at: DateTime<Utc>,
        outcome: &QuizOutcome,
    ) -> StoreResult<i64> {
        let id = session::insert_session(&self.acquire(), owner, direction, started_at, now(), outcome)?;
        log::info!(
            "Recorded quiz session {} ({}/{}{})",
            id,
            outcome.score,
            outcome.total,
            if outcome.aborted { ", abandoned" } else { "" }
        );
        Ok(id)
    }

    fn recent_sessions(&self, owner: &UserId, limit: usize) -> StoreResult<Vec<SessionRecord>> {
        Ok(session::list_sessions(&self.acquire(), owner, limit)?)
    }

    fn last_session(&self, owner: &UserId) -> StoreResult<Option<SessionRecord>> {
        Ok(session::list_sessions(&self.acquire(), owner, 1)?.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ana() -> UserId {
        UserId::new("ana")
    }

    #[test]
    fn test_migrations_create_tables() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"lessons".to_string()));
        assert!(tables.contains(&"flashcards".to_string()));
        assert!(tables.contains(&"quiz_sessions".to_string()));
    }

    #[test]
    fn test_open_on_disk_and_reopen() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("nested").join("vocab.db");
        {
            let store = SqliteStore::open(&db_path).unwrap();
            let lesson = store.create_lesson(&ana(), "Animals", Visibility::Private).unwrap();
            store
                .create_flashcard(&ana(), lesson.id, &CardDraft::new("cat", "kot"))
                .unwrap();
        }
        let store = SqliteStore::open(&db_path).unwrap();
        let cards = store.list_flashcards(&OwnerScope::Owned(ana())).unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].front, "cat");
    }

    #[test]
    fn test_create_flashcard_requires_lesson() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store
            .create_flashcard(&ana(), LessonId(9), &CardDraft::new("cat", "kot"))
            .unwrap_err();
        assert!(matches!(err, StoreError::LessonNotFound(LessonId(9))));
    }

    #[test]
    fn test_create_flashcard_trims_and_validates() {
        let store = SqliteStore::open_in_memory().unwrap();
        let lesson = store.create_lesson(&ana(), "Animals", Visibility::Private).unwrap();
        let card = store
            .create_flashcard(&ana(), lesson.id, &CardDraft::new("  cat ", " kot"))
            .unwrap();
        assert_eq!(card.front, "cat");
        assert_eq!(card.back, "kot");

        let err = store
            .create_flashcard(&ana(), lesson.id, &CardDraft::new("cat", "   "))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidCard(_)));
    }

    #[test]
    fn test_only_owner_can_modify() {
        let store = SqliteStore::open_in_memory().unwrap();
        let ben = UserId::new("ben");
        let lesson = store.create_lesson(&ana(), "Animals", Visibility::Shared).unwrap();
        let card = store
            .create_flashcard(&ana(), lesson.id, &CardDraft::new("cat", "kot"))
            .unwrap();

        assert!(matches!(
            store.create_flashcard(&ben, lesson.id, &CardDraft::new("dog", "pies")),
            Err(StoreError::NotOwner)
        ));
        assert!(matches!(store.delete_lesson(&ben, lesson.id), Err(StoreError::NotOwner)));
        assert!(matches!(store.delete_flashcard(&ben, card.id), Err(StoreError::NotOwner)));
        assert!(matches!(
            store.set_lesson_visibility(&ben, lesson.id, Visibility::Private),
            Err(StoreError::NotOwner)
        ));
    }

    #[test]
    fn test_bulk_create_is_all_or_nothing() {
        let store = SqliteStore::open_in_memory().unwrap();
        let lesson = store.create_lesson(&ana(), "Animals", Visibility::Private).unwrap();
        let drafts = vec![CardDraft::new("cat", "kot"), CardDraft::new("", "pies")];
        assert!(store.bulk_create_flashcards(&ana(), lesson.id, &drafts).is_err());
        assert!(store.list_flashcards(&OwnerScope::Owned(ana())).unwrap().is_empty());

        let drafts = vec![CardDraft::new("cat", "kot"), CardDraft::new("dog", "pies")];
        let cards = store.bulk_create_flashcards(&ana(), lesson.id, &drafts).unwrap();
        assert_eq!(cards.len(), 2);
        assert!(cards.iter().all(|c| c.lesson_id == lesson.id));
    }

    #[test]
    fn test_delete_lesson_cascades() {
        let store = SqliteStore::open_in_memory().unwrap();
        let lesson = store.create_lesson(&ana(), "Animals", Visibility::Private).unwrap();
        let drafts = vec![CardDraft::new("cat", "kot"), CardDraft::new("dog", "pies")];
        store.bulk_create_flashcards(&ana(), lesson.id, &drafts).unwrap();

        assert_eq!(store.delete_lesson(&ana(), lesson.id).unwrap(), 2);
        assert!(store.list_lessons(&OwnerScope::Owned(ana())).unwrap().is_empty());
        assert!(store.list_flashcards(&OwnerScope::Owned(ana())).unwrap().is_empty());
    }

    #[test]
    fn test_sharing_a_lesson() {
        let store = SqliteStore::open_in_memory().unwrap();
        let ben = OwnerScope::Visible(UserId::new("ben"));
        let lesson = store.create_lesson(&ana(), "Animals", Visibility::Private).unwrap();
        store
            .create_flashcard(&ana(), lesson.id, &CardDraft::new("cat", "kot"))
            .unwrap();
        assert!(store.list_lessons(&ben).unwrap().is_empty());

        store
            .set_lesson_visibility(&ana(), lesson.id, Visibility::Shared)
            .unwrap();
        assert_eq!(store.list_lessons(&ben).unwrap().len(), 1);
        let cards = store.list_flashcards(&ben).unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].visibility, Visibility::Shared);
    }

    #[test]
    fn test_subscribe_pushes_snapshots() {
        let store = SqliteStore::open_in_memory().unwrap();
        let rx = store.subscribe(OwnerScope::Owned(ana())).unwrap();
        assert_eq!(rx.try_recv().unwrap(), LibrarySnapshot::default());

        let lesson = store.create_lesson(&ana(), "Animals", Visibility::Private).unwrap();
        let snapshot = rx.try_recv().unwrap();
        assert_eq!(snapshot.lessons, vec![lesson.clone()]);

        store
            .create_flashcard(&ana(), lesson.id, &CardDraft::new("cat", "kot"))
            .unwrap();
        assert_eq!(rx.try_recv().unwrap().flashcards.len(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let store = SqliteStore::open_in_memory().unwrap();
        let rx = store.subscribe(OwnerScope::Owned(ana())).unwrap();
        drop(rx);
        store.create_lesson(&ana(), "Animals", Visibility::Private).unwrap();
        assert!(store.subscribers.lock().unwrap().is_empty());
    }

    #[test]
    fn test_session_history() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.last_session(&ana()).unwrap().is_none());

        let outcome = QuizOutcome {
            score: 0,
            total: 0,
            aborted: true,
            questions: Vec::new(),
        };
        let first = store
            .record_session(&ana(), Direction::FrontToBack, now(), &outcome)
            .unwrap();
        let second = store
            .record_session(&ana(), Direction::BackToFront, now(), &outcome)
            .unwrap();

        let last = store.last_session(&ana()).unwrap().unwrap();
        assert_eq!(last.id, second);
        assert_eq!(last.direction, Direction::BackToFront);
        assert_eq!(store.recent_sessions(&ana(), 10).unwrap().len(), 2);
        assert_ne!(first, second);
    }
}
