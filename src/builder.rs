//! Turns a pool of flashcards into the ordered question list of a session.

use crate::error::SessionError;
use crate::models::{Direction, Flashcard, LessonId, SessionQuestion};
use crate::utils::shuffle_with;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Which lessons a session draws its cards from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LessonFilter {
    #[default]
    All,
    Lessons(HashSet<LessonId>),
}

impl LessonFilter {
    pub fn lessons(ids: impl IntoIterator<Item = LessonId>) -> Self {
        LessonFilter::Lessons(ids.into_iter().collect())
    }
}

/// How an explicit but empty lesson selection is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmptySelection {
    /// Nothing selected means every lesson.
    #[default]
    AllLessons,
    /// Nothing selected means nothing to study.
    NoCards,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SessionBuilder {
    direction: Direction,
    empty_selection: EmptySelection,
}

impl SessionBuilder {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            empty_selection: EmptySelection::default(),
        }
    }

    pub fn with_empty_selection(mut self, policy: EmptySelection) -> Self {
        self.empty_selection = policy;
        self
    }

    /// Cards of `pool` admitted by `filter`, in pool order.
    pub fn select<'a>(&self, pool: &'a [Flashcard], filter: &LessonFilter) -> Vec<&'a Flashcard> {
        match filter {
            LessonFilter::All => pool.iter().collect(),
            LessonFilter::Lessons(ids) if ids.is_empty() => match self.empty_selection {
                EmptySelection::AllLessons => pool.iter().collect(),
                EmptySelection::NoCards => Vec::new(),
            },
            LessonFilter::Lessons(ids) => pool
                .iter()
                .filter(|card| ids.contains(&card.lesson_id))
                .collect(),
        }
    }

    pub fn build(
        &self,
        pool: &[Flashcard],
        filter: &LessonFilter,
        requested: usize,
    ) -> Result<Vec<SessionQuestion>, SessionError> {
        self.build_with_rng(pool, filter, requested, &mut rand::thread_rng())
    }

    pub fn build_with_rng<R: Rng + ?Sized>(
        &self,
        pool: &[Flashcard],
        filter: &LessonFilter,
        requested: usize,
        rng: &mut R,
    ) -> Result<Vec<SessionQuestion>, SessionError> {
        let mut eligible = self.select(pool, filter);
        if eligible.is_empty() {
            log::info!("No cards match the lesson selection");
            return Err(SessionError::NoEligibleCards);
        }

        shuffle_with(&mut eligible, rng);
        eligible.truncate(requested.min(eligible.len()));
        if eligible.is_empty() {
            return Err(SessionError::InsufficientCards);
        }

        log::debug!(
            "Built session with {} questions ({})",
            eligible.len(),
            self.direction.as_str()
        );
        Ok(eligible
            .into_iter()
            .map(|card| SessionQuestion::from_card(card, self.direction))
            .collect())
    }

    /// The same questions as a previous session, attempts cleared, in a new order.
    pub fn rebuild(previous: &[SessionQuestion]) -> Vec<SessionQuestion> {
        Self::rebuild_with_rng(previous, &mut rand::thread_rng())
    }

    pub fn rebuild_with_rng<R: Rng + ?Sized>(
        previous: &[SessionQuestion],
        rng: &mut R,
    ) -> Vec<SessionQuestion> {
        let mut questions = previous.to_vec();
        for question in &mut questions {
            question.reset();
        }
        shuffle_with(&mut questions, rng);
        questions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CardId;
    use crate::models::fixtures::pool;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn ids(questions: &[SessionQuestion]) -> Vec<CardId> {
        let mut ids: Vec<CardId> = questions.iter().map(|q| q.card_id).collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_build_returns_requested_count() {
        let cards = pool(2, 6);
        let mut rng = StdRng::seed_from_u64(1);
        let builder = SessionBuilder::default();
        for requested in 1..=12 {
            let questions = builder
                .build_with_rng(&cards, &LessonFilter::All, requested, &mut rng)
                .unwrap();
            assert_eq!(questions.len(), requested);
            let mut unique = ids(&questions);
            unique.dedup();
            assert_eq!(unique.len(), requested, "duplicates in session");
        }
    }

    #[test]
    fn test_build_caps_to_pool_size() {
        let cards = pool(2, 6);
        let builder = SessionBuilder::default();
        let questions = builder.build(&cards, &LessonFilter::All, 100).unwrap();
        assert_eq!(questions.len(), 12);
        let expected: Vec<CardId> = (1..=12).map(CardId).collect();
        assert_eq!(ids(&questions), expected);
    }

    #[test]
    fn test_build_scoped_to_lesson() {
        let cards = pool(2, 6);
        let builder = SessionBuilder::default();
        let filter = LessonFilter::lessons([LessonId(1)]);
        let questions = builder.build(&cards, &filter, 10).unwrap();
        assert_eq!(questions.len(), 6);
        assert!(questions.iter().all(|q| q.lesson_id == LessonId(1)));

        for _ in 0..20 {
            let replay = SessionBuilder::rebuild(&questions);
            assert_eq!(replay.len(), 6);
            assert_eq!(ids(&replay), ids(&questions));
        }
    }

    #[test]
    fn test_build_uses_direction() {
        let cards = pool(1, 3);
        let builder = SessionBuilder::new(Direction::BackToFront);
        let questions = builder.build(&cards, &LessonFilter::All, 3).unwrap();
        for q in &questions {
            assert!(q.prompt.starts_with("back"));
            assert!(q.expected.starts_with("front"));
            assert!(q.submitted.is_none());
        }
    }

    #[test]
    fn test_build_no_eligible_cards() {
        let cards = pool(2, 6);
        let builder = SessionBuilder::default();
        let filter = LessonFilter::lessons([LessonId(99)]);
        assert_eq!(
            builder.build(&cards, &filter, 10),
            Err(SessionError::NoEligibleCards)
        );
        assert_eq!(
            builder.build(&[], &LessonFilter::All, 10),
            Err(SessionError::NoEligibleCards)
        );
    }

    #[test]
    fn test_build_zero_requested() {
        let cards = pool(1, 3);
        let builder = SessionBuilder::default();
        assert_eq!(
            builder.build(&cards, &LessonFilter::All, 0),
            Err(SessionError::InsufficientCards)
        );
    }

    #[test]
    fn test_empty_selection_policies() {
        let cards = pool(2, 3);
        let empty = LessonFilter::Lessons(HashSet::new());

        let all = SessionBuilder::default().with_empty_selection(EmptySelection::AllLessons);
        assert_eq!(all.build(&cards, &empty, 10).unwrap().len(), 6);

        let none = SessionBuilder::default().with_empty_selection(EmptySelection::NoCards);
        assert_eq!(
            none.build(&cards, &empty, 10),
            Err(SessionError::NoEligibleCards)
        );
    }

    #[test]
    fn test_rebuild_clears_attempts() {
        let cards = pool(1, 4);
        let mut questions = SessionBuilder::default()
            .build(&cards, &LessonFilter::All, 4)
            .unwrap();
        for q in &mut questions {
            q.submitted = Some("x".to_string());
            q.correct = Some(false);
        }
        let replay = SessionBuilder::rebuild(&questions);
        assert!(replay.iter().all(|q| q.correct.is_none() && q.submitted.is_none()));
    }

    const N: usize = 5;
    const TRIALS: usize = 20_000;

    /// Chi-square over the position of every card across many shuffles.
    fn assert_positions_uniform(counts: &[[usize; N]; N]) {
        let expected = (TRIALS / N) as f64;
        for row in counts {
            let chi_square: f64 = row
                .iter()
                .map(|&observed| {
                    let diff = observed as f64 - expected;
                    diff * diff / expected
                })
                .sum();
            // 4 degrees of freedom; 30.0 sits far beyond the 0.01% critical value.
            assert!(chi_square < 30.0, "chi-square {chi_square} too large: {row:?}");
        }
    }

    #[test]
    fn test_shuffle_positions_are_uniform() {
        let cards = pool(1, N as i64);
        let builder = SessionBuilder::default();
        let mut rng = StdRng::seed_from_u64(42);
        let mut counts = [[0usize; N]; N];

        for _ in 0..TRIALS {
            let questions = builder
                .build_with_rng(&cards, &LessonFilter::All, N, &mut rng)
                .unwrap();
            for (position, q) in questions.iter().enumerate() {
                counts[(q.card_id.0 - 1) as usize][position] += 1;
            }
        }
        assert_positions_uniform(&counts);
    }

    #[test]
    fn test_rebuild_positions_are_uniform() {
        let cards = pool(1, N as i64);
        let previous: Vec<SessionQuestion> = cards
            .iter()
            .map(|card| SessionQuestion::from_card(card, Direction::FrontToBack))
            .collect();
        let mut rng = StdRng::seed_from_u64(7);
        let mut counts = [[0usize; N]; N];

        for _ in 0..TRIALS {
            let questions = SessionBuilder::rebuild_with_rng(&previous, &mut rng);
            assert_eq!(questions.len(), N);
            for (position, q) in questions.iter().enumerate() {
                counts[(q.card_id.0 - 1) as usize][position] += 1;
            }
        }
        assert_positions_uniform(&counts);
    }
}
