pub mod builder;
pub mod cli;
pub mod config;
pub mod console;
pub mod db;
pub mod error;
pub mod file_io;
pub mod import;
pub mod logger;
pub mod models;
pub mod ocr;
pub mod ports;
pub mod quiz;
pub mod quiz_driver;
pub mod study;
pub mod utils;

// Re-exports for convenience
pub use builder::{EmptySelection, LessonFilter, SessionBuilder};
pub use config::Config;
pub use db::SqliteStore;
pub use error::{AppError, ImportError, SessionError, StoreError};
pub use import::{ImportSummary, parse_bulk_line, parse_bulk_text};
pub use models::{CardDraft, CardId, Direction, Flashcard, Lesson, LessonId, UserId, Visibility};
pub use ports::{AuthProvider, Confirm, LibraryStore, OwnerScope, SessionHistory, TextExtractor};
pub use quiz::{FEEDBACK_INTERVAL, QuizOutcome, QuizRunner, QuizState};
pub use quiz_driver::{QuizEvent, QuizUpdate, run_quiz};
pub use study::{CardFace, StudyCycler, StudyStep};
