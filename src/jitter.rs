//! Injectable random source for pacing and fingerprint jitter
//!
//! Every randomized decision in the crate (delays, viewport sizes, scroll
//! distances) is drawn from a shared [`Jitter`]. Production code seeds it from
//! the OS; tests seed it with a fixed value to get a repeatable sequence.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::Range;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Thread-safe random source shared by the resolver, scheduler and visitor
#[derive(Debug)]
pub struct Jitter {
    rng: Mutex<StdRng>,
}

impl Jitter {
    /// Creates a random source seeded from the operating system
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Creates a deterministic random source
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Samples a whole number of milliseconds uniformly from `[min_ms, max_ms]`
    ///
    /// Both bounds are inclusive. An inverted range is clamped to `min_ms`.
    pub fn millis_between(&self, min_ms: u64, max_ms: u64) -> u64 {
        if max_ms <= min_ms {
            return min_ms;
        }
        self.with_rng(|rng| rng.random_range(min_ms..=max_ms))
    }

    /// Samples a delay uniformly from `[min_ms, max_ms]` milliseconds
    pub fn delay_between(&self, min_ms: u64, max_ms: u64) -> Duration {
        Duration::from_millis(self.millis_between(min_ms, max_ms))
    }

    /// Samples an integer from a half-open range
    ///
    /// An empty range yields its start.
    pub fn pick(&self, range: Range<u32>) -> u32 {
        if range.is_empty() {
            return range.start;
        }
        self.with_rng(|rng| rng.random_range(range))
    }

    /// Returns true with the given probability
    pub fn chance(&self, probability: f64) -> bool {
        let p = probability.clamp(0.0, 1.0);
        self.with_rng(|rng| rng.random_bool(p))
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut rng)
    }
}

impl Default for Jitter {
    fn default() -> Self {
        Self::from_entropy()
    }
}
