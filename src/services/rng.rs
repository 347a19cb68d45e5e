//! Process-wide random source for reviewer selection.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};

/// A mutex-guarded generator shared by every pass that selects reviewers.
///
/// Clones share the same generator.
#[derive(Debug, Clone)]
pub struct SharedRng {
    inner: Arc<Mutex<StdRng>>,
}

impl SharedRng {
    pub fn from_entropy() -> Self {
        Self::wrap(StdRng::from_entropy())
    }

    /// Deterministic generator for tests and reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self::wrap(StdRng::seed_from_u64(seed))
    }

    /// Seeded when a seed is configured, otherwise from entropy.
    pub fn from_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }

    fn wrap(rng: StdRng) -> Self {
        Self {
            inner: Arc::new(Mutex::new(rng)),
        }
    }

    fn with<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        // A panic mid-draw cannot leave StdRng in an invalid state.
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    /// Uniform draw in `[0, 1)`.
    pub fn next_f64(&self) -> f64 {
        self.with(|rng| rng.gen::<f64>())
    }

    /// Uniform index in `0..len`. `len` must be non-zero.
    pub fn index(&self, len: usize) -> usize {
        self.with(|rng| rng.gen_range(0..len))
    }
}
