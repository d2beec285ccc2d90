//! Placeholder metrics for hosts without /proc access
//!
//! Values are random within fixed ceilings and carry no information about the
//! machine. Useful for exercising the reporting path on any platform.

use super::{MetricsSnapshot, MetricsSource};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

pub const MAX_CPU_PERCENT: f64 = 50.0;
pub const MAX_RAM_PERCENT: f64 = 70.0;
pub const MAX_DISK_PERCENT: f64 = 80.0;

pub struct SyntheticMetricsSource {
    rng: Xoshiro256PlusPlus,
}

impl SyntheticMetricsSource {
    pub fn new() -> Self {
        Self {
            rng: Xoshiro256PlusPlus::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }
}

impl Default for SyntheticMetricsSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSource for SyntheticMetricsSource {
    fn sample(&mut self) -> MetricsSnapshot {
        MetricsSnapshot::now(
            self.rng.gen_range(0.0..=MAX_CPU_PERCENT),
            self.rng.gen_range(0.0..=MAX_RAM_PERCENT),
            self.rng.gen_range(0.0..=MAX_DISK_PERCENT),
            None,
        )
    }

    fn name(&self) -> &'static str {
        "synthetic"
    }
}
