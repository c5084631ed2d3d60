use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier handed out by the auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LessonId(pub i64);

impl fmt::Display for LessonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CardId(pub i64);

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Visibility {
    Private,
    Shared,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::Shared => "shared",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "shared" => Visibility::Shared,
            _ => Visibility::Private,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    pub id: LessonId,
    pub name: String,
    pub owner: UserId,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flashcard {
    pub id: CardId,
    pub front: String,
    pub back: String,
    pub lesson_id: LessonId,
    pub visibility: Visibility,
    pub owner: UserId,
    pub created_at: DateTime<Utc>,
}

/// A front/back pair that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardDraft {
    pub front: String,
    pub back: String,
}

impl CardDraft {
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
        }
    }
}

/// Which side of the card is asked and which one is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    #[default]
    FrontToBack,
    BackToFront,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::FrontToBack => "front-to-back",
            Direction::BackToFront => "back-to-front",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "back-to-front" => Direction::BackToFront,
            _ => Direction::FrontToBack,
        }
    }
}

/// A flashcard resolved into a prompt and an expected answer for one session,
/// plus the outcome of the attempt at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionQuestion {
    pub card_id: CardId,
    pub lesson_id: LessonId,
    pub prompt: String,
    pub expected: String,
    pub submitted: Option<String>,
    pub correct: Option<bool>,
}

impl SessionQuestion {
    pub fn from_card(card: &Flashcard, direction: Direction) -> Self {
        let (prompt, expected) = match direction {
            Direction::FrontToBack => (&card.front, &card.back),
            Direction::BackToFront => (&card.back, &card.front),
        };
        Self {
            card_id: card.id,
            lesson_id: card.lesson_id,
            prompt: prompt.clone(),
            expected: expected.clone(),
            submitted: None,
            correct: None,
        }
    }

    /// Forget the previous attempt so the question can be asked again.
    pub fn reset(&mut self) {
        self.submitted = None;
        self.correct = None;
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn card(id: i64, lesson: i64, front: &str, back: &str) -> Flashcard {
        Flashcard {
            id: CardId(id),
            front: front.to_string(),
            back: back.to_string(),
            lesson_id: LessonId(lesson),
            visibility: Visibility::Private,
            owner: UserId::new("tester"),
            created_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    /// `per_lesson` cards in each of `lessons` lessons, ids counting from 1.
    pub fn pool(lessons: i64, per_lesson: i64) -> Vec<Flashcard> {
        let mut cards = Vec::new();
        for lesson in 1..=lessons {
            for n in 0..per_lesson {
                let id = (lesson - 1) * per_lesson + n + 1;
                cards.push(card(
                    id,
                    lesson,
                    &format!("front {id}"),
                    &format!("back {id}"),
                ));
            }
        }
        cards
    }
}
