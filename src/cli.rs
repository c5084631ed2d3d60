use crate::builder::{LessonFilter, SessionBuilder};
use crate::config::Config;
use crate::console::{self, StdinConfirm};
use crate::db::SqliteStore;
use crate::error::{AppError, ImportError};
use crate::file_io::save_session_report;
use crate::import::{ImportSummary, import_csv, import_image, import_text};
use crate::models::{CardDraft, CardId, Direction, LessonId, UserId, Visibility};
use crate::ocr::CommandExtractor;
use crate::ports::{
    AssumeYes, AuthProvider, Confirm, LibraryStore, OwnerScope, SessionHistory, StaticIdentity,
};
use crate::quiz::{FEEDBACK_INTERVAL, QuizRunner};
use crate::study::StudyCycler;
use crate::utils::{format_session_date, truncate_string};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "vocab", about = "Vocabulary flashcards: lessons, quizzes and study", version)]
pub struct Cli {
    /// Config file (default: config.toml in the data directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage lessons
    #[command(subcommand)]
    Lesson(LessonCommand),

    /// Manage flashcards
    #[command(subcommand)]
    Card(CardCommand),

    /// Add many cards to a lesson at once
    Import {
        lesson: i64,
        /// File to read ("-" for stdin with the text format)
        path: PathBuf,
        #[arg(long, value_enum, default_value = "text")]
        format: ImportFormat,
    },

    /// Take a scored quiz
    Quiz {
        /// Lessons to draw from, comma-separated. Without values the
        /// configured empty-selection policy applies.
        #[arg(long = "lesson", num_args = 0.., value_delimiter = ',')]
        lessons: Option<Vec<i64>>,
        #[arg(long)]
        count: Option<usize>,
        /// Seconds per question, 0 for no limit
        #[arg(long)]
        time_limit: Option<u64>,
        /// Ask the back of each card and expect the front
        #[arg(long)]
        reverse: bool,
        /// Ask the questions of the last quiz again in a new order
        #[arg(long, conflicts_with_all = ["lessons", "count", "reverse"])]
        replay: bool,
        /// Write a markdown report of the finished quiz
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Flip through cards without scoring
    Study {
        #[arg(long = "lesson", num_args = 0.., value_delimiter = ',')]
        lessons: Option<Vec<i64>>,
        /// Stop at the last card instead of starting over
        #[arg(long)]
        no_wrap: bool,
    },

    /// List recent quizzes
    History {
        #[arg(long, default_value = "10")]
        limit: usize,
    },
}

#[derive(Subcommand, Debug)]
pub enum LessonCommand {
    /// List your lessons and shared ones
    List,
    /// Create a lesson
    Add {
        name: String,
        #[arg(long, conflicts_with = "private")]
        shared: bool,
        #[arg(long)]
        private: bool,
    },
    /// Make a lesson visible to everyone
    Share { lesson: i64 },
    /// Make a lesson private again
    Unshare { lesson: i64 },
    /// Delete a lesson and all its cards
    Delete {
        lesson: i64,
        /// Do not ask for confirmation
        #[arg(long, short)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum CardCommand {
    /// List cards
    List {
        #[arg(long)]
        lesson: Option<i64>,
    },
    /// Add one card
    Add {
        lesson: i64,
        front: String,
        back: String,
    },
    /// Delete one card
    Delete {
        card: i64,
        #[arg(long, short)]
        yes: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ImportFormat {
    /// `front - back` or `front: back` per line
    Text,
    /// `front,back` per line
    Csv,
    /// An image run through the configured OCR command
    Image,
}

fn lesson_filter(lessons: Option<Vec<i64>>) -> LessonFilter {
    match lessons {
        None => LessonFilter::All,
        Some(ids) => LessonFilter::lessons(ids.into_iter().map(LessonId)),
    }
}

fn confirmer(yes: bool) -> Box<dyn Confirm> {
    if yes {
        Box::new(AssumeYes)
    } else {
        Box::new(StdinConfirm)
    }
}

pub async fn run(cli: Cli, config: &Config) -> Result<(), AppError> {
    let identity = StaticIdentity::new(config.user_id());
    let user = identity.current_user().ok_or(AppError::NotSignedIn)?;
    let store = SqliteStore::open(&config.database_path())?;
    let mut out = io::stdout();

    match cli.command {
        Command::Lesson(cmd) => lesson_command(&store, &user, config, cmd, &mut out),
        Command::Card(cmd) => card_command(&store, &user, cmd, &mut out),
        Command::Import {
            lesson,
            path,
            format,
        } => {
            let summary = import(&store, &user, config, LessonId(lesson), &path, format).await?;
            writeln!(out, "{}", summary)?;
            for rejected in &summary.rejected {
                writeln!(
                    out,
                    "  line {}: {} ({})",
                    rejected.line_number,
                    truncate_string(&rejected.content, 40),
                    rejected.reason
                )?;
            }
            Ok(())
        }
        Command::Quiz {
            lessons,
            count,
            time_limit,
            reverse,
            replay,
            report,
        } => {
            let direction = if reverse {
                Direction::BackToFront
            } else {
                config.quiz.direction
            };
            let (direction, questions) = if replay {
                let last = store
                    .last_session(&user)?
                    .ok_or_else(|| AppError::Usage("No previous quiz to replay".to_string()))?;
                (last.direction, SessionBuilder::rebuild(&last.outcome.questions))
            } else {
                let pool = store.list_flashcards(&OwnerScope::Visible(user.clone()))?;
                let builder = SessionBuilder::new(direction)
                    .with_empty_selection(config.quiz.empty_selection);
                let count = count.unwrap_or(config.quiz.question_count);
                (direction, builder.build(&pool, &lesson_filter(lessons), count)?)
            };

            let budget = match time_limit {
                Some(secs) => Some(Duration::from_secs(secs)),
                None => config.quiz.time_limit(),
            };
            let runner = QuizRunner::new(questions, budget)?;
            let started_at = Utc::now();
            let outcome = console::run_terminal_quiz(runner, FEEDBACK_INTERVAL).await?;
            store.record_session(&user, direction, started_at, &outcome)?;
            if let Some(path) = report {
                save_session_report(&path, direction, started_at, &outcome)?;
                writeln!(out, "Report written to {}", path.display())?;
            }
            Ok(())
        }
        Command::Study { lessons, no_wrap } => {
            let pool = store.list_flashcards(&OwnerScope::Visible(user.clone()))?;
            let builder =
                SessionBuilder::default().with_empty_selection(config.quiz.empty_selection);
            let cards = builder
                .select(&pool, &lesson_filter(lessons))
                .into_iter()
                .cloned()
                .collect();
            let mut cycler = StudyCycler::new(cards, config.study.wrap && !no_wrap)?;
            console::run_study(&mut cycler, io::stdin().lock(), &mut out)?;
            Ok(())
        }
        Command::History { limit } => history(&store, &user, limit, &mut out),
    }
}

fn lesson_command<S: LibraryStore, W: Write>(
    store: &S,
    user: &UserId,
    config: &Config,
    cmd: LessonCommand,
    out: &mut W,
) -> Result<(), AppError> {
    match cmd {
        LessonCommand::List => {
            let scope = OwnerScope::Visible(user.clone());
            let lessons = store.list_lessons(&scope)?;
            let cards = store.list_flashcards(&scope)?;
            if lessons.is_empty() {
                writeln!(out, "No lessons yet.")?;
            }
            for lesson in lessons {
                let count = cards.iter().filter(|c| c.lesson_id == lesson.id).count();
                let owner = if &lesson.owner == user {
                    String::new()
                } else {
                    format!(" by {}", lesson.owner)
                };
                writeln!(
                    out,
                    "{:>4}  {} ({} cards, {}{})",
                    lesson.id,
                    lesson.name,
                    count,
                    lesson.visibility.as_str(),
                    owner
                )?;
            }
        }
        LessonCommand::Add {
            name,
            shared,
            private,
        } => {
            let visibility = if shared || (config.teacher_mode && !private) {
                Visibility::Shared
            } else {
                Visibility::Private
            };
            let lesson = store.create_lesson(user, &name, visibility)?;
            writeln!(out, "Created lesson {} ({})", lesson.id, visibility.as_str())?;
        }
        LessonCommand::Share { lesson } => {
            store.set_lesson_visibility(user, LessonId(lesson), Visibility::Shared)?;
            writeln!(out, "Lesson {} is now shared", lesson)?;
        }
        LessonCommand::Unshare { lesson } => {
            store.set_lesson_visibility(user, LessonId(lesson), Visibility::Private)?;
            writeln!(out, "Lesson {} is now private", lesson)?;
        }
        LessonCommand::Delete { lesson, yes } => {
            delete_lesson(store, user, LessonId(lesson), confirmer(yes).as_ref(), out)?;
        }
    }
    Ok(())
}

fn delete_lesson<S: LibraryStore, W: Write>(
    store: &S,
    user: &UserId,
    lesson: LessonId,
    confirm: &dyn Confirm,
    out: &mut W,
) -> Result<(), AppError> {
    if !confirm.confirm(&format!("Delete lesson {} and all its cards?", lesson)) {
        writeln!(out, "Cancelled.")?;
        return Ok(());
    }
    let removed = store.delete_lesson(user, lesson)?;
    writeln!(out, "Deleted lesson {} ({} cards)", lesson, removed)?;
    Ok(())
}

fn card_command<S: LibraryStore, W: Write>(
    store: &S,
    user: &UserId,
    cmd: CardCommand,
    out: &mut W,
) -> Result<(), AppError> {
    match cmd {
        CardCommand::List { lesson } => {
            let cards = store.list_flashcards(&OwnerScope::Visible(user.clone()))?;
            for card in cards
                .iter()
                .filter(|c| lesson.is_none_or(|id| c.lesson_id == LessonId(id)))
            {
                writeln!(
                    out,
                    "{:>4}  [{}] {} - {}",
                    card.id,
                    card.lesson_id,
                    truncate_string(&card.front, 30),
                    truncate_string(&card.back, 30)
                )?;
            }
        }
        CardCommand::Add { lesson, front, back } => {
            let card = store.create_flashcard(user, LessonId(lesson), &CardDraft::new(front, back))?;
            writeln!(out, "Created card {}", card.id)?;
        }
        CardCommand::Delete { card, yes } => {
            delete_card(store, user, CardId(card), confirmer(yes).as_ref(), out)?;
        }
    }
    Ok(())
}

fn delete_card<S: LibraryStore, W: Write>(
    store: &S,
    user: &UserId,
    card: CardId,
    confirm: &dyn Confirm,
    out: &mut W,
) -> Result<(), AppError> {
    if !confirm.confirm(&format!("Delete card {}?", card)) {
        writeln!(out, "Cancelled.")?;
        return Ok(());
    }
    store.delete_flashcard(user, card)?;
    writeln!(out, "Deleted card {}", card)?;
    Ok(())
}

async fn import<S: LibraryStore>(
    store: &S,
    user: &UserId,
    config: &Config,
    lesson: LessonId,
    path: &std::path::Path,
    format: ImportFormat,
) -> Result<ImportSummary, ImportError> {
    match format {
        ImportFormat::Text => {
            let text = if path.as_os_str() == "-" {
                let mut text = String::new();
                io::stdin().read_to_string(&mut text)?;
                text
            } else {
                std::fs::read_to_string(path)?
            };
            import_text(store, user, lesson, &text)
        }
        ImportFormat::Csv => import_csv(store, user, lesson, path),
        ImportFormat::Image => {
            let command = config
                .ocr
                .command
                .as_deref()
                .ok_or(crate::error::ExtractError::NotConfigured)?;
            let extractor = CommandExtractor::parse(command)?;
            import_image(&extractor, store, user, lesson, path).await
        }
    }
}

fn history<S: SessionHistory, W: Write>(
    store: &S,
    user: &UserId,
    limit: usize,
    out: &mut W,
) -> Result<(), AppError> {
    let sessions = store.recent_sessions(user, limit)?;
    if sessions.is_empty() {
        writeln!(out, "No quizzes yet.")?;
    }
    for session in sessions {
        let outcome = &session.outcome;
        writeln!(
            out,
            "{:<14} {:>3}/{:<3} {:>4.0}%  {}{}",
            format_session_date(session.finished_at),
            outcome.score,
            outcome.total,
            outcome.percentage(),
            session.direction.as_str(),
            if outcome.aborted { "  (abandoned)" } else { "" }
        )?;
    }
    Ok(())
}
