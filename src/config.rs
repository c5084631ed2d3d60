//! Settings loaded from `config.toml`.
//!
//! Every field has a default, so a missing file or a file with only a few
//! keys is valid.

use crate::builder::EmptySelection;
use crate::db::get_data_dir;
use crate::error::ConfigError;
use crate::models::{Direction, UserId};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub fn default_config_path() -> PathBuf {
    get_data_dir().join("config.toml")
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Defaults to `vocab.db` in the data directory.
    pub database_path: Option<PathBuf>,
    /// Identity used to scope the library. Commands that touch the library
    /// fail without one.
    pub user: Option<String>,
    /// New lessons are shared unless `--private` is given.
    pub teacher_mode: bool,
    pub quiz: QuizConfig,
    pub study: StudyConfig,
    pub ocr: OcrConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QuizConfig {
    pub question_count: usize,
    /// Seconds per question; 0 means no limit.
    pub time_limit_secs: u64,
    pub direction: Direction,
    pub empty_selection: EmptySelection,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            question_count: 10,
            time_limit_secs: 0,
            direction: Direction::default(),
            empty_selection: EmptySelection::default(),
        }
    }
}

impl QuizConfig {
    pub fn time_limit(&self) -> Option<Duration> {
        (self.time_limit_secs > 0).then(|| Duration::from_secs(self.time_limit_secs))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StudyConfig {
    pub wrap: bool,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self { wrap: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OcrConfig {
    /// e.g. `tesseract {image} -`
    pub command: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    pub level: String,
    /// Append log lines here instead of stderr.
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
        }
    }
}

impl Config {
    /// Loads `path`, or the default location when `None`. Only an explicitly
    /// given file is required to exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (default_config_path(), false),
        };
        if !required && !path.exists() {
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(&path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.quiz.question_count == 0 {
            return Err(ConfigError::InvalidValue(
                "quiz.question_count".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        if let Some(user) = &self.user
            && user.trim().is_empty()
        {
            return Err(ConfigError::InvalidValue(
                "user".to_string(),
                "must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(crate::db::get_db_path)
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user.as_deref().map(|u| UserId::new(u.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.quiz.question_count, 10);
        assert_eq!(config.quiz.time_limit(), None);
        assert!(config.study.wrap);
        assert!(!config.teacher_mode);
        assert!(config.user_id().is_none());
    }

    #[test]
    fn test_full_file() {
        let config = Config::parse(
            r#"
            database_path = "/tmp/vocab.db"
            user = "ana"
            teacher_mode = true

            [quiz]
            question_count = 5
            time_limit_secs = 15
            direction = "back-to-front"
            empty_selection = "no-cards"

            [study]
            wrap = false

            [ocr]
            command = "tesseract {image} -"

            [log]
            level = "debug"
            file = "/tmp/vocab.log"
            "#,
        )
        .unwrap();

        assert_eq!(config.database_path(), PathBuf::from("/tmp/vocab.db"));
        assert_eq!(config.user_id(), Some(UserId::new("ana")));
        assert!(config.teacher_mode);
        assert_eq!(config.quiz.question_count, 5);
        assert_eq!(config.quiz.time_limit(), Some(Duration::from_secs(15)));
        assert_eq!(config.quiz.direction, Direction::BackToFront);
        assert_eq!(config.quiz.empty_selection, EmptySelection::NoCards);
        assert!(!config.study.wrap);
        assert_eq!(config.ocr.command.as_deref(), Some("tesseract {image} -"));
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn test_rejects_zero_question_count() {
        let err = Config::parse("[quiz]\nquestion_count = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(..)));
    }

    #[test]
    fn test_rejects_unknown_keys() {
        assert!(matches!(
            Config::parse("colour = \"blue\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_feedback_interval_is_fixed() {
        assert!(matches!(
            Config::parse("[quiz]\nfeedback_millis = 0"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_explicit_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "user = \"ben\"").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.user_id(), Some(UserId::new("ben")));

        let missing = temp_dir.path().join("missing.toml");
        assert!(matches!(
            Config::load(Some(&missing)),
            Err(ConfigError::Io(_))
        ));
    }
}
