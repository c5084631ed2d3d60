use crate::models::{CardId, LessonId};

/// Conditions raised while building or driving a session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("No cards match the selected lessons")]
    NoEligibleCards,
    #[error("No cards are left after applying the question count")]
    InsufficientCards,
    #[error("A quiz needs at least one question")]
    EmptySession,
    #[error("The session is already finished")]
    Finished,
    #[error("The quiz is not waiting for an answer")]
    NotAwaitingAnswer,
    #[error("No answer feedback is being shown")]
    NoFeedbackPending,
}

impl SessionError {
    /// True for conditions that should be shown to the user as a notice
    /// rather than treated as a failure.
    pub fn is_informational(&self) -> bool {
        matches!(
            self,
            SessionError::NoEligibleCards | SessionError::InsufficientCards
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Migration error: {0}")]
    Migration(#[from] refinery::Error),
    #[error("Failed to encode session record: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("Lesson {0} does not exist")]
    LessonNotFound(LessonId),
    #[error("Flashcard {0} does not exist")]
    CardNotFound(CardId),
    #[error("Only the owner may modify this item")]
    NotOwner,
    #[error("Invalid flashcard: {0}")]
    InvalidCard(String),
    #[error("Lesson name must not be empty")]
    EmptyLessonName,
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("No text extraction command is configured")]
    NotConfigured,
    #[error("Failed to run text extraction command: {0}")]
    Io(#[from] std::io::Error),
    #[error("Text extraction exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Failed to read import file: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Top-level error for the command-line front end.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No user is signed in; set `user` in the config file")]
    NotSignedIn,
    #[error("{0}")]
    Usage(String),
}
