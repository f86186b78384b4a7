//! Injectable randomness for eviction and response selection.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of uniform random indices.
pub trait RandomSource: Send + Sync {
    /// Uniform index in `0..len`. `len` must be non-zero.
    fn index(&self, len: usize) -> usize;
}

/// Thread-local OS-seeded randomness.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn index(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

/// Deterministic randomness from a fixed seed.
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
    fn index(&self, len: usize) -> usize {
        // A poisoned lock still holds a usable generator.
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        rng.gen_range(0..len)
    }
}

/// Pick one element uniformly; `None` for an empty slice.
pub fn choose<'a, T>(random: &dyn RandomSource, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        None
    } else {
        items.get(random.index(items.len()))
    }
}
