//! Turning pasted, extracted or CSV text into flashcards.

use crate::error::ImportError;
use crate::models::{CardDraft, LessonId, UserId};
use crate::ports::{LibraryStore, TextExtractor};
use std::fmt;
use std::path::Path;

/// A line that could not be turned into a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedLine {
    /// 1-based.
    pub line_number: usize,
    pub content: String,
    pub reason: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedImport {
    pub drafts: Vec<CardDraft>,
    pub rejected: Vec<RejectedLine>,
}

impl ParsedImport {
    fn from_lines(
        text: &str,
        parse: impl Fn(&str) -> Result<CardDraft, &'static str>,
    ) -> Self {
        let mut parsed = ParsedImport::default();
        for (i, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match parse(line) {
                Ok(draft) => parsed.drafts.push(draft),
                Err(reason) => parsed.rejected.push(RejectedLine {
                    line_number: i + 1,
                    content: line.to_string(),
                    reason,
                }),
            }
        }
        parsed
    }
}

/// Result of an import, shown as "N imported, M failed".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub rejected: Vec<RejectedLine>,
}

impl ImportSummary {
    pub fn failed(&self) -> usize {
        self.rejected.len()
    }
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} imported, {} failed", self.imported, self.failed())
    }
}

fn draft_from_parts(front: &str, back: &str) -> Result<CardDraft, &'static str> {
    let front = front.trim();
    let back = back.trim();
    if front.is_empty() || back.is_empty() {
        return Err("both sides must be non-empty");
    }
    Ok(CardDraft::new(front, back))
}

/// Splits on the first `-` or `:`, whichever comes first.
pub fn parse_bulk_line(line: &str) -> Result<CardDraft, &'static str> {
    let Some(pos) = line.find(['-', ':']) else {
        return Err("no '-' or ':' separator");
    };
    draft_from_parts(&line[..pos], &line[pos + 1..])
}

pub fn parse_bulk_text(text: &str) -> ParsedImport {
    ParsedImport::from_lines(text, parse_bulk_line)
}

/// Splits one `front,back` CSV record. Fields may be quoted, and `""` inside
/// quotes is a literal quote. Anything after the second field is ignored.
pub fn parse_csv_line(line: &str) -> Option<(String, String)> {
    let mut chars = line.chars().peekable();
    let mut fields = [String::new(), String::new()];
    let mut field = 0;
    let mut in_quotes = false;

    while let Some(c) = chars.next() {
        match c {
            '"' if !in_quotes => in_quotes = true,
            '"' if chars.peek() == Some(&'"') => {
                chars.next();
                fields[field].push('"');
            }
            '"' => in_quotes = false,
            ',' if !in_quotes => {
                if field == 1 {
                    break;
                }
                field = 1;
            }
            _ => fields[field].push(c),
        }
    }

    if field == 0 {
        return None;
    }
    let [front, back] = fields;
    Some((front, back))
}

pub fn parse_csv(text: &str) -> ParsedImport {
    ParsedImport::from_lines(text, |line| {
        let (front, back) = parse_csv_line(line).ok_or("missing ',' separator")?;
        draft_from_parts(&front, &back)
    })
}

fn store_parsed<S: LibraryStore + ?Sized>(
    store: &S,
    owner: &UserId,
    lesson: LessonId,
    parsed: ParsedImport,
) -> Result<ImportSummary, ImportError> {
    for rejected in &parsed.rejected {
        log::warn!(
            "Skipping line {} ({}): {:?}",
            rejected.line_number,
            rejected.reason,
            rejected.content
        );
    }
    let imported = if parsed.drafts.is_empty() {
        0
    } else {
        store
            .bulk_create_flashcards(owner, lesson, &parsed.drafts)?
            .len()
    };
    let summary = ImportSummary {
        imported,
        rejected: parsed.rejected,
    };
    log::info!("Import into lesson {}: {}", lesson, summary);
    Ok(summary)
}

/// Imports `front - back` or `front: back` lines.
pub fn import_text<S: LibraryStore + ?Sized>(
    store: &S,
    owner: &UserId,
    lesson: LessonId,
    text: &str,
) -> Result<ImportSummary, ImportError> {
    store_parsed(store, owner, lesson, parse_bulk_text(text))
}

pub fn import_csv<S: LibraryStore + ?Sized>(
    store: &S,
    owner: &UserId,
    lesson: LessonId,
    path: &Path,
) -> Result<ImportSummary, ImportError> {
    let content = std::fs::read_to_string(path)?;
    store_parsed(store, owner, lesson, parse_csv(&content))
}

/// Extracts text from `image` and imports it as bulk lines.
pub async fn import_image<S: LibraryStore + ?Sized>(
    extractor: &dyn TextExtractor,
    store: &S,
    owner: &UserId,
    lesson: LessonId,
    image: &Path,
) -> Result<ImportSummary, ImportError> {
    let text = extractor.extract_text(image).await?;
    log::debug!("Extracted {} bytes of text from {}", text.len(), image.display());
    import_text(store, owner, lesson, &text)
}
