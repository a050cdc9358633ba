//! Deterministic random number generation.
//!
//! RULE: Nothing in the session may call a process-global RNG.
//! Every random choice flows through the SimRng handed to
//! `SimulationController::init_with_rng`, seeded from the config.
//!
//! Draw order inside init is fixed (vehicle spawn point, then
//! destination). Adding a draw anywhere in between changes every
//! seeded destination.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

pub struct SimRng {
    seed:  Option<u64>,
    inner: Pcg64Mcg,
}

impl SimRng {
    /// Seeded generator. Same seed, same sequence.
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed:  Some(seed),
            inner: Pcg64Mcg::seed_from_u64(seed),
        }
    }

    /// Generator seeded from OS entropy. Not reproducible.
    pub fn from_entropy() -> Self {
        Self {
            seed:  None,
            inner: Pcg64Mcg::from_entropy(),
        }
    }

    /// Seeded when `seed` is set, entropy otherwise.
    pub fn from_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(s) => Self::seeded(s),
            None    => Self::from_entropy(),
        }
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Uniform index in [0, n). Panics if n == 0.
    pub fn index_below(&mut self, n: usize) -> usize {
        assert!(n > 0, "n must be > 0");
        self.inner.gen_range(0..n)
    }

    /// Uniformly pick one element, or None for an empty slice.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let idx = self.index_below(items.len());
        items.get(idx)
    }
}
