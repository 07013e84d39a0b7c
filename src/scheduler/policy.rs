//! Replacement selection policies for emergency cover.
//!
//! A policy picks one worker out of the eligible candidates for an
//! uncovered shift. Random selection takes an explicit seed and is
//! reproducible.

use std::fmt::Debug;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// A worker eligible to take over a shift.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverCandidate {
    pub worker_id: String,
    /// Roster index.
    pub worker: usize,
    /// Hours already held in the schedule being repaired.
    pub hours: i64,
}

/// Chooses the replacement for an absent worker.
pub trait CoverPolicy: Debug {
    /// Policy name (e.g. "least-loaded").
    fn name(&self) -> &'static str;

    /// Index into `candidates` of the chosen worker, `None` to leave the
    /// shift uncovered. `candidates` is in roster order.
    fn select(&mut self, candidates: &[CoverCandidate]) -> Option<usize>;
}

/// Picks the candidate with the fewest hours (ties: roster order).
#[derive(Debug, Clone, Copy, Default)]
pub struct LeastLoaded;

impl CoverPolicy for LeastLoaded {
    fn name(&self) -> &'static str {
        "least-loaded"
    }

    fn select(&mut self, candidates: &[CoverCandidate]) -> Option<usize> {
        candidates
            .iter()
            .enumerate()
            .min_by_key(|(_, c)| (c.hours, c.worker))
            .map(|(i, _)| i)
    }
}

/// Uniform random choice from a seeded generator.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: SmallRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl CoverPolicy for SeededRandom {
    fn name(&self) -> &'static str {
        "seeded-random"
    }

    fn select(&mut self, candidates: &[CoverCandidate]) -> Option<usize> {
        if candidates.is_empty() {
            return None;
        }
        Some(self.rng.random_range(0..candidates.len()))
    }
}
