// src/engine/sequencer.rs

use std::fmt;

use rand::Rng;

use crate::{
    engine::{
        difficulty::{Difficulty, SEED_ORDER},
        pool::QuestionPool,
        scoring::grade,
    },
    models::{attempt::AnswerMap, question::Question},
};

/// Consecutive correct answers needed before escalating difficulty.
pub const STREAK_TO_ESCALATE: u32 = 2;

/// Difficulty to draw next, given the difficulty just answered.
pub fn target_difficulty(current: Difficulty, correct: bool, streak: u32) -> Difficulty {
    match (correct, streak >= STREAK_TO_ESCALATE) {
        (true, true) => current.harder(),
        (true, false) => current,
        (false, _) => current.easier(),
    }
}

/// The bank had nothing to offer for a first question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoQuestionsAvailable;

impl fmt::Display for NoQuestionsAvailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("no questions available")
    }
}

impl std::error::Error for NoQuestionsAvailable {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequencerError {
    /// The chosen text is not one of the current question's options.
    UnknownOption(String),
    /// Advancing needs a selected option for the question at the cursor.
    Unanswered(i64),
}

impl fmt::Display for SequencerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequencerError::UnknownOption(text) => {
                write!(f, "'{}' is not an option of the current question", text)
            }
            SequencerError::Unanswered(id) => {
                write!(f, "question {} has no selected answer", id)
            }
        }
    }
}

impl std::error::Error for SequencerError {}

/// Result of answering and moving forward.
#[derive(Debug, PartialEq)]
pub enum Step<'a> {
    Next(&'a Question),
    /// Every bucket is empty; the session has to be submitted.
    Exhausted,
}

/// Adaptive question sequencing for one quiz session.
#[derive(Debug, Clone)]
pub struct Sequencer {
    bank: Vec<Question>,
    sequence: Vec<Question>,
    cursor: usize,
    streak: u32,
    answers: AnswerMap,
}

impl Sequencer {
    /// Seeds a session with a random medium question, falling back to easy then hard.
    pub fn start<R: Rng + ?Sized>(
        bank: Vec<Question>,
        rng: &mut R,
    ) -> Result<Self, NoQuestionsAvailable> {
        let first = QuestionPool::derive(&bank, &[])
            .draw_in_order(&SEED_ORDER, rng)
            .cloned()
            .ok_or(NoQuestionsAvailable)?;

        Ok(Self {
            bank,
            sequence: vec![first],
            cursor: 0,
            streak: 0,
            answers: AnswerMap::new(),
        })
    }

    pub fn current(&self) -> &Question {
        &self.sequence[self.cursor]
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn sequence(&self) -> &[Question] {
        &self.sequence
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn selected(&self) -> Option<&str> {
        self.answers.get(&self.current().id).map(String::as_str)
    }

    pub fn question_order(&self) -> Vec<i64> {
        self.sequence.iter().map(|q| q.id).collect()
    }

    /// Questions not yet drawn.
    pub fn remaining(&self) -> usize {
        QuestionPool::derive(&self.bank, &self.sequence).len()
    }

    pub fn is_at_end(&self) -> bool {
        self.cursor + 1 == self.sequence.len()
    }

    /// Last question reached and nothing left to draw.
    pub fn is_exhausted(&self) -> bool {
        self.is_at_end() && self.remaining() == 0
    }

    /// Records the chosen option for the question at the cursor (last write wins).
    pub fn select(&mut self, text: impl Into<String>) -> Result<(), SequencerError> {
        let text = text.into();
        let current = self.current();
        if !current.has_option(&text) {
            return Err(SequencerError::UnknownOption(text));
        }
        let id = current.id;
        self.answers.insert(id, text);
        Ok(())
    }

    /// Grades the question at the cursor and moves forward, drawing a new
    /// question when the cursor is at the end of the sequence.
    pub fn advance<R: Rng + ?Sized>(
        &mut self,
        answer: Option<String>,
        rng: &mut R,
    ) -> Result<Step<'_>, SequencerError> {
        if let Some(answer) = answer {
            self.select(answer)?;
        }

        let current = self.current();
        let selected = self
            .answers
            .get(&current.id)
            .ok_or(SequencerError::Unanswered(current.id))?;
        let previous = current.difficulty;
        let correct = grade(current, Some(selected.as_str()));

        if !self.is_at_end() {
            self.move_to(self.cursor + 1);
            return Ok(Step::Next(self.current()));
        }

        // The streak itself is only rederived once the cursor actually moves.
        let streak = if correct { self.streak + 1 } else { 0 };
        let target = target_difficulty(previous, correct, streak);
        let pool = QuestionPool::derive(&self.bank, &self.sequence);
        let next = pool
            .draw(target, rng)
            .or_else(|| pool.draw(previous, rng))
            .cloned();

        match next {
            Some(question) => {
                self.sequence.push(question);
                self.move_to(self.cursor + 1);
                Ok(Step::Next(self.current()))
            }
            None => Ok(Step::Exhausted),
        }
    }

    /// Moves the cursor one question back. Answers and the sequence are kept.
    pub fn back(&mut self) -> Option<&Question> {
        if self.cursor == 0 {
            return None;
        }
        self.move_to(self.cursor - 1);
        Some(self.current())
    }

    fn move_to(&mut self, position: usize) {
        self.cursor = position;
        self.streak = self.trailing_streak();
    }

    /// Contiguous correct answers immediately before the cursor.
    fn trailing_streak(&self) -> u32 {
        self.sequence[..self.cursor]
            .iter()
            .rev()
            .take_while(|q| {
                self.answers
                    .get(&q.id)
                    .is_some_and(|a| grade(q, Some(a.as_str())))
            })
            .count() as u32
    }
}
