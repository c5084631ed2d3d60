use super::{now, timestamp};
use crate::models::{CardDraft, CardId, Flashcard, Lesson, LessonId, UserId, Visibility};
use crate::ports::OwnerScope;
use rusqlite::{Connection, OptionalExtension, Result, Row};

const CARD_COLUMNS: &str = "id, front, back, lesson_id, visibility, owner, created_at";

fn flashcard_from_row(row: &Row<'_>) -> Result<Flashcard> {
    Ok(Flashcard {
        id: CardId(row.get(0)?),
        front: row.get(1)?,
        back: row.get(2)?,
        lesson_id: LessonId(row.get(3)?),
        visibility: Visibility::parse(&row.get::<_, String>(4)?),
        owner: UserId::new(row.get::<_, String>(5)?),
        created_at: timestamp(row.get(6)?),
    })
}

/// Stores `draft` in `lesson`, copying the lesson's owner and visibility.
pub fn insert_flashcard(conn: &Connection, lesson: &Lesson, draft: &CardDraft) -> Result<Flashcard> {
    let created_at = now();
    conn.execute(
        "INSERT INTO flashcards (lesson_id, front, back, owner, visibility, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            lesson.id.0,
            draft.front,
            draft.back,
            lesson.owner.as_str(),
            lesson.visibility.as_str(),
            created_at.timestamp()
        ],
    )?;

    Ok(Flashcard {
        id: CardId(conn.last_insert_rowid()),
        front: draft.front.clone(),
        back: draft.back.clone(),
        lesson_id: lesson.id,
        visibility: lesson.visibility,
        owner: lesson.owner.clone(),
        created_at,
    })
}

pub fn get_flashcard(conn: &Connection, id: CardId) -> Result<Option<Flashcard>> {
    conn.query_row(
        &format!("SELECT {CARD_COLUMNS} FROM flashcards WHERE id = ?"),
        [id.0],
        flashcard_from_row,
    )
    .optional()
}

pub fn list_flashcards(conn: &Connection, scope: &OwnerScope) -> Result<Vec<Flashcard>> {
    let sql = match scope {
        OwnerScope::Owned(_) => format!(
            "SELECT {CARD_COLUMNS} FROM flashcards WHERE owner = ? ORDER BY lesson_id, id"
        ),
        OwnerScope::Visible(_) => format!(
            "SELECT {CARD_COLUMNS} FROM flashcards WHERE owner = ? OR visibility = 'shared'
             ORDER BY lesson_id, id"
        ),
    };
    let mut stmt = conn.prepare(&sql)?;
    let cards = stmt
        .query_map([scope.user().as_str()], flashcard_from_row)?
        .collect::<Result<Vec<_>>>()?;
    Ok(cards)
}

pub fn delete_flashcard(conn: &Connection, id: CardId) -> Result<usize> {
    conn.execute("DELETE FROM flashcards WHERE id = ?", [id.0])
}
