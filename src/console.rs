//! Line-oriented terminal presentation for quizzes and study.

use crate::ports::Confirm;
use crate::quiz::{QuizOutcome, QuizRunner};
use crate::quiz_driver::{QuizEvent, QuizUpdate, run_quiz};
use crate::study::{CardFace, StudyCycler, StudyStep};
use crate::utils::truncate_string;
use std::future::Future;
use std::io::{self, BufRead, Write};
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

const MAX_PROMPT_WIDTH: usize = 72;

/// Read stdin on a dedicated thread so the async side never blocks on it.
/// The receiver closes at end of input.
pub fn spawn_stdin_reader() -> io::Result<UnboundedReceiver<String>> {
    let (tx, rx) = unbounded_channel();
    thread::Builder::new()
        .name("vocab::stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        log::warn!("Failed to read stdin: {}", e);
                        break;
                    }
                }
            }
            log::debug!("Stdin reader exiting");
        })?;
    Ok(rx)
}

pub fn parse_quiz_input(line: &str) -> QuizEvent {
    match line.trim() {
        ":skip" => QuizEvent::Skip,
        ":quit" => QuizEvent::Abandon,
        _ => QuizEvent::Answer(line.to_string()),
    }
}

pub fn render_update<W: Write>(out: &mut W, update: &QuizUpdate) -> io::Result<()> {
    match update {
        QuizUpdate::Question {
            index,
            total,
            prompt,
            time_budget,
        } => {
            let limit = time_budget
                .map(|d| format!(" ({}s)", d.as_secs()))
                .unwrap_or_default();
            writeln!(out)?;
            writeln!(
                out,
                "[{}/{}]{} {}",
                index + 1,
                total,
                limit,
                truncate_string(prompt, MAX_PROMPT_WIDTH)
            )?;
            write!(out, "> ")?;
        }
        QuizUpdate::Feedback(feedback) => {
            if feedback.correct {
                writeln!(out, "Correct!")?;
            } else if feedback.timed_out {
                writeln!(out, "Time's up! Expected: {}", feedback.expected)?;
            } else if feedback.submitted.is_empty() {
                writeln!(out, "Skipped. Expected: {}", feedback.expected)?;
            } else {
                writeln!(out, "Wrong. Expected: {}", feedback.expected)?;
            }
        }
        QuizUpdate::Finished(outcome) => {
            writeln!(out)?;
            if outcome.aborted {
                writeln!(out, "Quiz abandoned.")?;
            }
            writeln!(
                out,
                "Score: {}/{} ({:.0}%)",
                outcome.score,
                outcome.total,
                outcome.percentage()
            )?;
        }
    }
    out.flush()
}

async fn present<W: Write>(
    mut updates: UnboundedReceiver<QuizUpdate>,
    mut lines: UnboundedReceiver<String>,
    events: UnboundedSender<QuizEvent>,
    interrupt: impl Future<Output = ()>,
    out: &mut W,
) {
    tokio::pin!(interrupt);
    let mut interrupted = false;
    let mut input_open = true;

    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(update) = update else { break };
                if let Err(e) = render_update(out, &update) {
                    log::warn!("Failed to write quiz output: {}", e);
                }
                if matches!(update, QuizUpdate::Finished(_)) {
                    break;
                }
            }
            line = lines.recv(), if input_open => {
                let event = match line {
                    Some(line) => parse_quiz_input(&line),
                    None => {
                        input_open = false;
                        QuizEvent::EndOfInput
                    }
                };
                let _ = events.send(event);
            }
            _ = &mut interrupt, if !interrupted => {
                interrupted = true;
                log::info!("Interrupted, abandoning quiz");
                let _ = events.send(QuizEvent::Abandon);
            }
        }
    }
}

/// Run a quiz fed by `lines`, writing to `out`. `interrupt` resolving
/// abandons the quiz.
pub async fn quiz_console<W: Write>(
    runner: QuizRunner,
    feedback_interval: Duration,
    lines: UnboundedReceiver<String>,
    interrupt: impl Future<Output = ()>,
    out: &mut W,
) -> QuizOutcome {
    let (event_tx, event_rx) = unbounded_channel();
    let (update_tx, update_rx) = unbounded_channel();
    let (outcome, ()) = tokio::join!(
        run_quiz(runner, event_rx, update_tx, feedback_interval),
        present(update_rx, lines, event_tx, interrupt, out),
    );
    outcome
}

/// Quiz on the terminal: answers from stdin, Ctrl-C abandons.
pub async fn run_terminal_quiz(
    runner: QuizRunner,
    feedback_interval: Duration,
) -> io::Result<QuizOutcome> {
    let lines = spawn_stdin_reader()?;
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    writeln!(io::stdout(), "Type your answer, :skip to skip, :quit to stop.")?;
    Ok(quiz_console(runner, feedback_interval, lines, interrupt, &mut io::stdout()).await)
}

fn render_card<W: Write>(out: &mut W, cycler: &StudyCycler) -> io::Result<()> {
    let face = match cycler.face() {
        CardFace::Front => "front",
        CardFace::Back => "back",
    };
    writeln!(
        out,
        "[{}/{}] {}: {}",
        cycler.index() + 1,
        cycler.len(),
        face,
        cycler.visible_text()
    )
}

/// Flip-card study driven by single-letter commands: n(ext), p(rev), f(lip),
/// q(uit).
pub fn run_study<R: BufRead, W: Write>(
    cycler: &mut StudyCycler,
    input: R,
    out: &mut W,
) -> io::Result<()> {
    writeln!(out, "n: next, p: previous, f: flip, q: quit")?;
    render_card(out, cycler)?;

    for line in input.lines() {
        match line?.trim() {
            "n" | "" => match cycler.next() {
                StudyStep::CycleComplete { wrapped: true } => {
                    writeln!(out, "End of deck, starting over.")?
                }
                StudyStep::CycleComplete { wrapped: false } => writeln!(out, "End of deck.")?,
                _ => {}
            },
            "p" => {
                if cycler.prev() == StudyStep::AtFirstCard {
                    writeln!(out, "Already at the first card.")?;
                }
            }
            "f" => {
                cycler.flip();
            }
            "q" => break,
            other => {
                writeln!(out, "Unknown command {:?}", other)?;
                continue;
            }
        }
        render_card(out, cycler)?;
    }
    Ok(())
}

/// Asks on stdout and reads y/N from stdin.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, message: &str) -> bool {
        let mut stdout = io::stdout();
        if write!(stdout, "{} [y/N] ", message).and_then(|_| stdout.flush()).is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}
