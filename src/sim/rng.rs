//! Injectable randomness
//!
//! The session never touches a global RNG: every draw goes through a
//! [`RandomSource`] so runs can be seeded or fully scripted.

use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// Uniform draws used by the session
pub trait RandomSource {
    /// Uniform float in `[0, 1)`
    fn next_unit(&mut self) -> f32;

    /// Uniform index in `0..len`. Callers never pass `len == 0`.
    fn next_index(&mut self, len: usize) -> usize;
}

/// Seeded PCG source
#[derive(Debug, Clone)]
pub struct SeededRandom {
    seed: u64,
    rng: Pcg32,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&mut self) -> f32 {
        self.rng.random::<f32>()
    }

    fn next_index(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        self.rng.random_range(0..len)
    }
}

/// Replays pre-recorded draws.
///
/// Once a queue runs dry, units fall back to `0.999` (never below any
/// probability threshold the session uses) and indices to `0`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRandom {
    units: VecDeque<f32>,
    indices: VecDeque<usize>,
}

impl ScriptedRandom {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_units(mut self, units: impl IntoIterator<Item = f32>) -> Self {
        self.units.extend(units);
        self
    }

    pub fn with_indices(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.indices.extend(indices);
        self
    }

    pub fn push_unit(&mut self, unit: f32) {
        self.units.push_back(unit);
    }

    pub fn push_index(&mut self, index: usize) {
        self.indices.push_back(index);
    }
}

impl RandomSource for ScriptedRandom {
    fn next_unit(&mut self) -> f32 {
        self.units.pop_front().unwrap_or(0.999)
    }

    fn next_index(&mut self, len: usize) -> usize {
        let index = self.indices.pop_front().unwrap_or(0);
        if len == 0 { 0 } else { index % len }
    }
}
