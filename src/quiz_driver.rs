use crate::quiz::{Countdown, Feedback, QuizOutcome, QuizRunner, QuizState, TimerToken};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::{Instant, sleep, sleep_until};

/// Intents sent by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizEvent {
    Answer(String),
    Skip,
    /// The session lost focus or was interrupted.
    Abandon,
    /// No further answers will come, e.g. piped input ran out.
    EndOfInput,
}

/// State changes published to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum QuizUpdate {
    Question {
        index: usize,
        total: usize,
        prompt: String,
        time_budget: Option<Duration>,
    },
    Feedback(Feedback),
    Finished(QuizOutcome),
}

async fn countdown(timer: Option<Countdown>) -> TimerToken {
    match timer {
        Some(c) => {
            sleep(c.duration).await;
            c.token
        }
        None => std::future::pending().await,
    }
}

fn apply(runner: &mut QuizRunner, event: QuizEvent) -> Option<Feedback> {
    match event {
        QuizEvent::Answer(answer) => runner.submit(&answer).ok(),
        QuizEvent::Skip => runner.skip().ok(),
        QuizEvent::Abandon | QuizEvent::EndOfInput => {
            runner.abandon();
            None
        }
    }
}

/// Drive `runner` until it finishes, reading intents from `events` and
/// publishing every state change on `updates`.
///
/// Answers that arrive while feedback is on screen are held back and given
/// to the next question. Abandonment is honoured at once. When input ends
/// (`EndOfInput` or a closed channel) the queued answers are still played
/// out; the quiz is abandoned only if a question is then left without one.
pub async fn run_quiz(
    mut runner: QuizRunner,
    mut events: UnboundedReceiver<QuizEvent>,
    updates: UnboundedSender<QuizUpdate>,
    feedback_interval: Duration,
) -> QuizOutcome {
    let mut feedback_deadline: Option<Instant> = None;
    let mut queued: VecDeque<QuizEvent> = VecDeque::new();
    let mut input_closed = false;

    loop {
        match runner.state() {
            QuizState::Finished { .. } => break,
            QuizState::AwaitingAnswer(index) => {
                if let Some(question) = runner.current() {
                    let _ = updates.send(QuizUpdate::Question {
                        index,
                        total: runner.len(),
                        prompt: question.prompt.clone(),
                        time_budget: runner.time_budget(),
                    });
                }

                let feedback = if let Some(event) = queued.pop_front() {
                    apply(&mut runner, event)
                } else if input_closed {
                    log::info!("Input ended before question {} was answered", index);
                    apply(&mut runner, QuizEvent::EndOfInput)
                } else {
                    tokio::select! {
                        event = events.recv() => {
                            let event = event.unwrap_or(QuizEvent::EndOfInput);
                            input_closed = event == QuizEvent::EndOfInput;
                            apply(&mut runner, event)
                        }
                        token = countdown(runner.pending_timer()) => runner.expire(token),
                    }
                };

                if let Some(feedback) = feedback {
                    feedback_deadline = Some(Instant::now() + feedback_interval);
                    let _ = updates.send(QuizUpdate::Feedback(feedback));
                }
            }
            QuizState::ShowingFeedback(_) => {
                let deadline = *feedback_deadline.get_or_insert_with(Instant::now);
                tokio::select! {
                    _ = sleep_until(deadline) => {
                        feedback_deadline = None;
                        let _ = runner.advance();
                    }
                    event = events.recv(), if !input_closed => match event {
                        Some(QuizEvent::Abandon) => {
                            runner.abandon();
                        }
                        Some(QuizEvent::EndOfInput) | None => input_closed = true,
                        Some(other) => {
                            log::debug!("Holding {:?} for the next question", other);
                            queued.push_back(other);
                        }
                    },
                }
            }
        }
    }

    // `run_quiz` only leaves the loop once the runner has finished.
    let outcome = runner.outcome().unwrap_or_else(|| QuizOutcome {
        score: runner.score(),
        total: runner.len(),
        aborted: true,
        questions: runner.questions().to_vec(),
    });
    let _ = updates.send(QuizUpdate::Finished(outcome.clone()));
    outcome
}
