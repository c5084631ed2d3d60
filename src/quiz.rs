//! Scored quiz over a fixed question list.
//!
//! `QuizRunner` is a plain state machine. It never sleeps: whoever drives it
//! schedules the per-question countdown it asks for (see [`Countdown`]) and
//! calls [`QuizRunner::advance`] once answer feedback has been shown.

use crate::error::SessionError;
use crate::models::SessionQuestion;
use crate::utils::answers_match;
use std::time::Duration;

/// How long the result of an answer stays on screen before the next question.
pub const FEEDBACK_INTERVAL: Duration = Duration::from_millis(1200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizState {
    AwaitingAnswer(usize),
    ShowingFeedback(usize),
    Finished { aborted: bool },
}

/// Identifies one armed countdown. Expiries carrying any other token are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerToken(u64);

/// A countdown the driver must schedule for the current question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    pub token: TimerToken,
    pub duration: Duration,
}

/// Result of judging one answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub index: usize,
    pub submitted: String,
    pub expected: String,
    pub correct: bool,
    pub timed_out: bool,
}

/// Final state of a finished quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizOutcome {
    pub score: usize,
    pub total: usize,
    pub aborted: bool,
    pub questions: Vec<SessionQuestion>,
}

impl QuizOutcome {
    pub fn percentage(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.score as f32 * 100.0 / self.total as f32
        }
    }
}

#[derive(Debug)]
pub struct QuizRunner {
    questions: Vec<SessionQuestion>,
    state: QuizState,
    score: usize,
    time_budget: Option<Duration>,
    timer: Option<TimerToken>,
    next_token: u64,
}

impl QuizRunner {
    /// A zero `time_budget` means no time limit.
    pub fn new(
        questions: Vec<SessionQuestion>,
        time_budget: Option<Duration>,
    ) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::EmptySession);
        }
        let mut runner = Self {
            questions,
            state: QuizState::AwaitingAnswer(0),
            score: 0,
            time_budget: time_budget.filter(|budget| !budget.is_zero()),
            timer: None,
            next_token: 0,
        };
        runner.arm_timer();
        Ok(runner)
    }

    pub fn state(&self) -> QuizState {
        self.state
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, QuizState::Finished { .. })
    }

    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget
    }

    pub fn questions(&self) -> &[SessionQuestion] {
        &self.questions
    }

    /// The question being asked or whose feedback is shown.
    pub fn current(&self) -> Option<&SessionQuestion> {
        match self.state {
            QuizState::AwaitingAnswer(i) | QuizState::ShowingFeedback(i) => self.questions.get(i),
            QuizState::Finished { .. } => None,
        }
    }

    /// The countdown armed for the current question, if any.
    pub fn pending_timer(&self) -> Option<Countdown> {
        match (self.timer, self.time_budget) {
            (Some(token), Some(duration)) => Some(Countdown { token, duration }),
            _ => None,
        }
    }

    pub fn submit(&mut self, raw_answer: &str) -> Result<Feedback, SessionError> {
        let index = self.awaiting_index()?;
        let correct = answers_match(raw_answer, &self.questions[index].expected);
        Ok(self.record(index, raw_answer, correct, false))
    }

    /// Move on without answering. Never scores.
    pub fn skip(&mut self) -> Result<Feedback, SessionError> {
        let index = self.awaiting_index()?;
        Ok(self.record(index, "", false, false))
    }

    /// The countdown identified by `token` ran out. Acts as a skip when the
    /// token is still the armed one; stale tokens are ignored.
    pub fn expire(&mut self, token: TimerToken) -> Option<Feedback> {
        if self.timer != Some(token) {
            log::debug!("Ignoring stale timer {:?}", token);
            return None;
        }
        let index = self.awaiting_index().ok()?;
        log::debug!("Time ran out on question {}", index);
        Some(self.record(index, "", false, true))
    }

    /// Leave the feedback of the current question for the next question, or
    /// finish after the last one.
    pub fn advance(&mut self) -> Result<QuizState, SessionError> {
        let index = match self.state {
            QuizState::ShowingFeedback(i) => i,
            QuizState::Finished { .. } => return Err(SessionError::Finished),
            QuizState::AwaitingAnswer(_) => return Err(SessionError::NoFeedbackPending),
        };

        if index + 1 < self.questions.len() {
            self.state = QuizState::AwaitingAnswer(index + 1);
            self.arm_timer();
        } else {
            self.state = QuizState::Finished { aborted: false };
            log::info!(
                "Quiz finished: {}/{} correct",
                self.score,
                self.questions.len()
            );
        }
        Ok(self.state)
    }

    /// Force the quiz to end, e.g. because the user left the session.
    /// Returns false when the quiz had already finished.
    pub fn abandon(&mut self) -> bool {
        if self.is_finished() {
            return false;
        }
        self.timer = None;
        self.state = QuizState::Finished { aborted: true };
        log::warn!(
            "Quiz abandoned at score {}/{}",
            self.score,
            self.questions.len()
        );
        true
    }

    pub fn outcome(&self) -> Option<QuizOutcome> {
        match self.state {
            QuizState::Finished { aborted } => Some(QuizOutcome {
                score: self.score,
                total: self.questions.len(),
                aborted,
                questions: self.questions.clone(),
            }),
            _ => None,
        }
    }

    fn awaiting_index(&self) -> Result<usize, SessionError> {
        match self.state {
            QuizState::AwaitingAnswer(i) => Ok(i),
            QuizState::ShowingFeedback(_) => Err(SessionError::NotAwaitingAnswer),
            QuizState::Finished { .. } => Err(SessionError::Finished),
        }
    }

    fn record(&mut self, index: usize, submitted: &str, correct: bool, timed_out: bool) -> Feedback {
        self.timer = None;
        let question = &mut self.questions[index];
        question.submitted = Some(submitted.to_string());
        question.correct = Some(correct);
        if correct {
            self.score += 1;
        }
        self.state = QuizState::ShowingFeedback(index);

        Feedback {
            index,
            submitted: submitted.to_string(),
            expected: question.expected.clone(),
            correct,
            timed_out,
        }
    }

    fn arm_timer(&mut self) {
        self.timer = None;
        if self.time_budget.is_some() {
            self.next_token += 1;
            self.timer = Some(TimerToken(self.next_token));
        }
    }
}
