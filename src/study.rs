use crate::error::SessionError;
use crate::models::Flashcard;
use crate::utils::shuffle_with;
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardFace {
    Front,
    Back,
}

/// Result of moving the study cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudyStep {
    Moved(usize),
    /// `next()` was called on the last card. When `wrapped` the cursor went
    /// back to the first card, otherwise it stayed put.
    CycleComplete { wrapped: bool },
    AtFirstCard,
}

/// Unscored flip-card study over a shuffled deck.
#[derive(Debug)]
pub struct StudyCycler {
    cards: Vec<Flashcard>,
    index: usize,
    face: CardFace,
    wrap: bool,
}

impl StudyCycler {
    pub fn new(cards: Vec<Flashcard>, wrap: bool) -> Result<Self, SessionError> {
        Self::with_rng(cards, wrap, &mut rand::thread_rng())
    }

    pub fn with_rng<R: Rng + ?Sized>(
        mut cards: Vec<Flashcard>,
        wrap: bool,
        rng: &mut R,
    ) -> Result<Self, SessionError> {
        if cards.is_empty() {
            return Err(SessionError::NoEligibleCards);
        }
        shuffle_with(&mut cards, rng);
        Ok(Self {
            cards,
            index: 0,
            face: CardFace::Front,
            wrap,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn face(&self) -> CardFace {
        self.face
    }

    pub fn current(&self) -> &Flashcard {
        &self.cards[self.index]
    }

    /// Text of the face currently shown.
    pub fn visible_text(&self) -> &str {
        let card = self.current();
        match self.face {
            CardFace::Front => &card.front,
            CardFace::Back => &card.back,
        }
    }

    pub fn flip(&mut self) -> CardFace {
        self.face = match self.face {
            CardFace::Front => CardFace::Back,
            CardFace::Back => CardFace::Front,
        };
        self.face
    }

    pub fn next(&mut self) -> StudyStep {
        if self.index + 1 < self.cards.len() {
            self.move_to(self.index + 1);
            return StudyStep::Moved(self.index);
        }
        if self.wrap {
            self.move_to(0);
        }
        StudyStep::CycleComplete { wrapped: self.wrap }
    }

    pub fn prev(&mut self) -> StudyStep {
        if self.index == 0 {
            return StudyStep::AtFirstCard;
        }
        self.move_to(self.index - 1);
        StudyStep::Moved(self.index)
    }

    fn move_to(&mut self, index: usize) {
        self.index = index;
        self.face = CardFace::Front;
    }
}
