//! Random selection sources for pairing
//!
//! Production code draws from the thread-local RNG (fresh entropy on every
//! call); tests inject [`SeededRandom`] for reproducible pairings.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

/// Uniform index selection used by the candidate store
pub trait RandomSource: Send + Sync {
    /// `amount` distinct indices drawn uniformly from `0..len`
    ///
    /// Returns fewer than `amount` only when `len < amount`.
    fn distinct_indices(&self, len: usize, amount: usize) -> Vec<usize>;

    /// One index drawn uniformly from `0..len`, `None` when `len == 0`
    fn index(&self, len: usize) -> Option<usize> {
        self.distinct_indices(len, 1).first().copied()
    }
}

fn sample<R: Rng + ?Sized>(rng: &mut R, len: usize, amount: usize) -> Vec<usize> {
    let amount = amount.min(len);
    rand::seq::index::sample(rng, len, amount).into_vec()
}

/// Thread-local RNG, reseeded from OS entropy by `rand`
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn distinct_indices(&self, len: usize, amount: usize) -> Vec<usize> {
        sample(&mut rand::thread_rng(), len, amount)
    }
}

/// Deterministic RNG for reproducible pairings
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn distinct_indices(&self, len: usize, amount: usize) -> Vec<usize> {
        // A poisoned lock still holds a usable RNG
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        sample(&mut *rng, len, amount)
    }
}
