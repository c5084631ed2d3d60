use super::{now, timestamp};
use crate::models::{Lesson, LessonId, UserId, Visibility};
use crate::ports::OwnerScope;
use rusqlite::{Connection, OptionalExtension, Result, Row};

const LESSON_COLUMNS: &str = "id, name, owner, visibility, created_at";

fn lesson_from_row(row: &Row<'_>) -> Result<Lesson> {
    Ok(Lesson {
        id: LessonId(row.get(0)?),
        name: row.get(1)?,
        owner: UserId::new(row.get::<_, String>(2)?),
        visibility: Visibility::parse(&row.get::<_, String>(3)?),
        created_at: timestamp(row.get(4)?),
    })
}

pub fn insert_lesson(
    conn: &Connection,
    owner: &UserId,
    name: &str,
    visibility: Visibility,
) -> Result<Lesson> {
    let created_at = now();
    conn.execute(
        "INSERT INTO lessons (name, owner, visibility, created_at) VALUES (?, ?, ?, ?)",
        rusqlite::params![name, owner.as_str(), visibility.as_str(), created_at.timestamp()],
    )?;

    Ok(Lesson {
        id: LessonId(conn.last_insert_rowid()),
        name: name.to_string(),
        owner: owner.clone(),
        visibility,
        created_at,
    })
}

pub fn get_lesson(conn: &Connection, id: LessonId) -> Result<Option<Lesson>> {
    conn.query_row(
        &format!("SELECT {LESSON_COLUMNS} FROM lessons WHERE id = ?"),
        [id.0],
        lesson_from_row,
    )
    .optional()
}

pub fn list_lessons(conn: &Connection, scope: &OwnerScope) -> Result<Vec<Lesson>> {
    let sql = match scope {
        OwnerScope::Owned(_) => format!(
            "SELECT {LESSON_COLUMNS} FROM lessons WHERE owner = ? ORDER BY created_at, id"
        ),
        OwnerScope::Visible(_) => format!(
            "SELECT {LESSON_COLUMNS} FROM lessons WHERE owner = ? OR visibility = 'shared'
             ORDER BY created_at, id"
        ),
    };
    let mut stmt = conn.prepare(&sql)?;
    let lessons = stmt
        .query_map([scope.user().as_str()], lesson_from_row)?
        .collect::<Result<Vec<_>>>()?;
    Ok(lessons)
}

/// Updates the lesson and every card in it. Returns the number of lessons changed.
pub fn update_visibility(conn: &Connection, id: LessonId, visibility: Visibility) -> Result<usize> {
    let changed = conn.execute(
        "UPDATE lessons SET visibility = ? WHERE id = ?",
        rusqlite::params![visibility.as_str(), id.0],
    )?;
    conn.execute(
        "UPDATE flashcards SET visibility = ? WHERE lesson_id = ?",
        rusqlite::params![visibility.as_str(), id.0],
    )?;
    Ok(changed)
}

/// Removes the lesson and its cards. Returns the number of cards removed.
pub fn delete_lesson(conn: &Connection, id: LessonId) -> Result<usize> {
    let cards = conn.execute("DELETE FROM flashcards WHERE lesson_id = ?", [id.0])?;
    conn.execute("DELETE FROM lessons WHERE id = ?", [id.0])?;
    Ok(cards)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::run_migrations;

    fn setup_db() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        conn
    }

    #[test]
    fn test_insert_and_get_lesson() {
        let conn = setup_db();
        let owner = UserId::new("ana");
        let lesson = insert_lesson(&conn, &owner, "Animals", Visibility::Private).unwrap();
        assert_eq!(lesson.id, LessonId(1));

        let loaded = get_lesson(&conn, lesson.id).unwrap().unwrap();
        assert_eq!(loaded, lesson);
    }

    #[test]
    fn test_get_missing_lesson() {
        let conn = setup_db();
        assert!(get_lesson(&conn, LessonId(42)).unwrap().is_none());
    }

    #[test]
    fn test_list_lessons_by_scope() {
        let conn = setup_db();
        let ana = UserId::new("ana");
        let ben = UserId::new("ben");
        insert_lesson(&conn, &ana, "Mine", Visibility::Private).unwrap();
        insert_lesson(&conn, &ben, "Ben private", Visibility::Private).unwrap();
        insert_lesson(&conn, &ben, "Ben shared", Visibility::Shared).unwrap();

        let owned = list_lessons(&conn, &OwnerScope::Owned(ana.clone())).unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].name, "Mine");

        let visible = list_lessons(&conn, &OwnerScope::Visible(ana)).unwrap();
        let names: Vec<&str> = visible.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Mine", "Ben shared"]);
    }
}
