//! Markdown reports of finished quizzes.

use crate::models::{Direction, SessionQuestion};
use crate::quiz::QuizOutcome;
use chrono::{DateTime, Local, Utc};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

pub fn write_session_header<W: Write>(
    out: &mut W,
    direction: Direction,
    started_at: DateTime<Utc>,
    outcome: &QuizOutcome,
) -> io::Result<()> {
    writeln!(out, "# Quiz session")?;
    writeln!(out)?;
    writeln!(
        out,
        "- Started: {}",
        started_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
    )?;
    writeln!(out, "- Direction: {}", direction.as_str())?;
    writeln!(
        out,
        "- Score: {}/{} ({:.0}%)",
        outcome.score,
        outcome.total,
        outcome.percentage()
    )?;
    if outcome.aborted {
        writeln!(out, "- Status: abandoned")?;
    }
    writeln!(out)
}

pub fn write_question_entry<W: Write>(
    out: &mut W,
    number: usize,
    question: &SessionQuestion,
) -> io::Result<()> {
    let mark = match question.correct {
        Some(true) => "correct",
        Some(false) => "wrong",
        None => "not answered",
    };
    writeln!(out, "## {}. {}", number, question.prompt)?;
    writeln!(out)?;
    match question.submitted.as_deref() {
        Some("") => writeln!(out, "- Answer: *(skipped)*")?,
        Some(answer) => writeln!(out, "- Answer: {}", answer)?,
        None => {}
    }
    writeln!(out, "- Expected: {}", question.expected)?;
    writeln!(out, "- Result: {}", mark)?;
    writeln!(out)
}

pub fn write_session_report<W: Write>(
    out: &mut W,
    direction: Direction,
    started_at: DateTime<Utc>,
    outcome: &QuizOutcome,
) -> io::Result<()> {
    write_session_header(out, direction, started_at, outcome)?;
    for (i, question) in outcome.questions.iter().enumerate() {
        write_question_entry(out, i + 1, question)?;
    }
    Ok(())
}

pub fn save_session_report(
    path: &Path,
    direction: Direction,
    started_at: DateTime<Utc>,
    outcome: &QuizOutcome,
) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_session_report(&mut out, direction, started_at, outcome)?;
    out.flush()?;
    log::info!("Wrote session report to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::card;

    fn outcome(aborted: bool) -> QuizOutcome {
        let mut right = SessionQuestion::from_card(&card(1, 1, "cat", "kot"), Direction::FrontToBack);
        right.submitted = Some("Kot".to_string());
        right.correct = Some(true);
        let mut skipped = SessionQuestion::from_card(&card(2, 1, "dog", "pies"), Direction::FrontToBack);
        skipped.submitted = Some(String::new());
        skipped.correct = Some(false);
        let untouched = SessionQuestion::from_card(&card(3, 1, "fish", "ryba"), Direction::FrontToBack);
        QuizOutcome {
            score: 1,
            total: 3,
            aborted,
            questions: vec![right, skipped, untouched],
        }
    }

    fn render(aborted: bool) -> String {
        let mut buf = Vec::new();
        write_session_report(&mut buf, Direction::FrontToBack, Utc::now(), &outcome(aborted)).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_report_contents() {
        let report = render(false);
        assert!(report.starts_with("# Quiz session\n"));
        assert!(report.contains("- Score: 1/3 (33%)"));
        assert!(report.contains("## 1. cat\n\n- Answer: Kot\n- Expected: kot\n- Result: correct"));
        assert!(report.contains("- Answer: *(skipped)*"));
        assert!(report.contains("## 3. fish\n\n- Expected: ryba\n- Result: not answered"));
        assert!(!report.contains("abandoned"));
    }

    #[test]
    fn test_report_marks_abandoned() {
        assert!(render(true).contains("- Status: abandoned"));
    }

    #[test]
    fn test_save_session_report() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("report.md");
        save_session_report(&path, Direction::BackToFront, Utc::now(), &outcome(false)).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("- Direction: back-to-front"));
    }
}
