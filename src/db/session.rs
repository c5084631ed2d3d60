use super::timestamp;
use crate::models::{Direction, SessionQuestion, UserId};
use crate::ports::SessionRecord;
use crate::quiz::QuizOutcome;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Result, Row};

const SESSION_COLUMNS: &str =
    "id, owner, direction, started_at, finished_at, questions_total, score, aborted, questions";

fn record_from_row(row: &Row<'_>) -> Result<SessionRecord> {
    let questions_json: String = row.get(8)?;
    let questions: Vec<SessionQuestion> = serde_json::from_str(&questions_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(8, Type::Text, Box::new(e)))?;

    Ok(SessionRecord {
        id: row.get(0)?,
        owner: UserId::new(row.get::<_, String>(1)?),
        direction: Direction::parse(&row.get::<_, String>(2)?),
        started_at: timestamp(row.get(3)?),
        finished_at: timestamp(row.get(4)?),
        outcome: QuizOutcome {
            total: row.get(5)?,
            score: row.get(6)?,
            aborted: row.get(7)?,
            questions,
        },
    })
}

pub fn insert_session(
    conn: &Connection,
    owner: &UserId,
    direction: Direction,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    outcome: &QuizOutcome,
) -> crate::ports::StoreResult<i64> {
    let questions = serde_json::to_string(&outcome.questions)?;
    conn.execute(
        "INSERT INTO quiz_sessions
         (owner, direction, started_at, finished_at, questions_total, score, aborted, questions)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            owner.as_str(),
            direction.as_str(),
            started_at.timestamp(),
            finished_at.timestamp(),
            outcome.total,
            outcome.score,
            outcome.aborted,
            questions
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_sessions(conn: &Connection, owner: &UserId, limit: usize) -> Result<Vec<SessionRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SESSION_COLUMNS} FROM quiz_sessions WHERE owner = ?
         ORDER BY finished_at DESC, id DESC LIMIT ?"
    ))?;
    let records = stmt
        .query_map(rusqlite::params![owner.as_str(), limit], record_from_row)?
        .collect::<Result<Vec<_>>>()?;
    Ok(records)
}
