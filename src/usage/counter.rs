use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::method::MethodRef;

/// Seed of the sampling PRNG. Fixed so sampling decisions are reproducible.
pub const SAMPLING_SEED: u64 = 42;

/// Fraction of calls that get emitted once a method has been called `count` times.
pub fn sampling_rate(count: u64) -> f64 {
    match count {
        0..=99 => 1.0,
        100..=999 => 0.1,
        1_000..=9_999 => 0.01,
        _ => 0.001,
    }
}

/// Per-method call counts plus the seeded draws used for sampling.
#[derive(Debug)]
pub struct MethodCounter {
    counts: HashMap<String, u64>,
    rng: StdRng,
}

impl Default for MethodCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl MethodCounter {
    pub fn new() -> Self {
        Self {
            counts: HashMap::new(),
            rng: StdRng::seed_from_u64(SAMPLING_SEED),
        }
    }

    /// Counts one more call and returns the new total.
    pub fn add(&mut self, method: &MethodRef) -> u64 {
        let count = self.counts.entry(method.key()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn get_count(&self, method: &MethodRef) -> u64 {
        self.counts.get(&method.key()).copied().unwrap_or(0)
    }

    /// Whether the current call of `method` should be emitted.
    pub fn should_sample(&mut self, method: &MethodRef) -> bool {
        let count = self.get_count(method);
        self.sample_at(count)
    }

    fn sample_at(&mut self, count: u64) -> bool {
        let rate = sampling_rate(count);
        // no draw below the first threshold
        rate >= 1.0 || self.rng.gen::<f64>() < rate
    }
}
