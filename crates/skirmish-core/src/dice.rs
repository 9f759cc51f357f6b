//! Random sources for checks and damage.
//!
//! Every roll in the engine goes through [`RandomSource`], so an encounter
//! can be replayed exactly from a seed ([`SeededDice`]) or driven by a
//! fixed script of results ([`ScriptedDice`]).

use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Source of die results.
pub trait RandomSource {
    /// Rolls one die with `sides` faces, returning `1..=sides`.
    fn roll_die(&mut self, sides: u8) -> u8;

    /// Rolls a d20.
    fn roll_d20(&mut self) -> u8 {
        self.roll_die(20)
    }
}

/// Deterministic dice seeded from a `u64`.
///
/// # Example
///
/// ```
/// use skirmish_core::dice::{RandomSource, SeededDice};
///
/// let mut a = SeededDice::new(42);
/// let mut b = SeededDice::new(42);
/// assert_eq!(a.roll_d20(), b.roll_d20());
/// ```
#[derive(Debug, Clone)]
pub struct SeededDice {
    seed: u64,
    rng: ChaCha8Rng,
}

impl SeededDice {
    /// Creates dice from a seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// The seed these dice were created with.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }
}

impl RandomSource for SeededDice {
    fn roll_die(&mut self, sides: u8) -> u8 {
        self.rng.gen_range(1..=sides.max(1))
    }
}

/// Dice that return queued results first, then fall back to seeded rolls.
///
/// Queued values are clamped to the die being rolled.
#[derive(Debug, Clone)]
pub struct ScriptedDice {
    script: VecDeque<u8>,
    fallback: SeededDice,
}

impl ScriptedDice {
    /// Creates dice that will return `results` in order.
    #[must_use]
    pub fn new(results: impl IntoIterator<Item = u8>) -> Self {
        Self {
            script: results.into_iter().collect(),
            fallback: SeededDice::new(0),
        }
    }

    /// Queues more results.
    pub fn push(&mut self, results: impl IntoIterator<Item = u8>) {
        self.script.extend(results);
    }

    /// Results not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl RandomSource for ScriptedDice {
    fn roll_die(&mut self, sides: u8) -> u8 {
        match self.script.pop_front() {
            Some(value) => value.clamp(1, sides.max(1)),
            None => self.fallback.roll_die(sides),
        }
    }
}
