// src/engine/pool.rs

use std::collections::HashSet;

use rand::{Rng, seq::IndexedRandom};

use crate::{engine::difficulty::Difficulty, models::question::Question};

/// Questions still available for a session, bucketed by difficulty.
///
/// Always derived from `(bank, sequence)`; never cached between steps.
#[derive(Debug, Default)]
pub struct QuestionPool<'a> {
    easy: Vec<&'a Question>,
    medium: Vec<&'a Question>,
    hard: Vec<&'a Question>,
}

impl<'a> QuestionPool<'a> {
    /// Partitions `bank` by difficulty, excluding anything already in `sequence`.
    pub fn derive(bank: &'a [Question], sequence: &[Question]) -> Self {
        let used: HashSet<i64> = sequence.iter().map(|q| q.id).collect();
        let mut pool = QuestionPool::default();
        for q in bank.iter().filter(|q| !used.contains(&q.id)) {
            match q.difficulty {
                Difficulty::Easy => pool.easy.push(q),
                Difficulty::Medium => pool.medium.push(q),
                Difficulty::Hard => pool.hard.push(q),
            }
        }
        pool
    }

    pub fn bucket(&self, difficulty: Difficulty) -> &[&'a Question] {
        match difficulty {
            Difficulty::Easy => &self.easy,
            Difficulty::Medium => &self.medium,
            Difficulty::Hard => &self.hard,
        }
    }

    pub fn len(&self) -> usize {
        self.easy.len() + self.medium.len() + self.hard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Uniform draw from the first non-empty bucket in `order`.
    pub fn draw_in_order<R: Rng + ?Sized>(
        &self,
        order: &[Difficulty],
        rng: &mut R,
    ) -> Option<&'a Question> {
        order
            .iter()
            .find_map(|d| self.bucket(*d).choose(&mut *rng).copied())
    }

    /// Uniform draw from `target`, walking its fallback chain when empty.
    pub fn draw<R: Rng + ?Sized>(&self, target: Difficulty, rng: &mut R) -> Option<&'a Question> {
        self.draw_in_order(&target.fallback_chain(), rng)
    }
}
