//! Deterministic random number generation for synthetic data.
//!
//! RULE: Nothing here may call any platform RNG.
//! Every draw flows from a single master seed, split into one stream per
//! purpose: (master_seed XOR stream_index * golden ratio). Adding a stream
//! never changes the draws of existing streams.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

pub struct SeededRng {
    pub stream: &'static str,
    inner:      Pcg64Mcg,
}

impl SeededRng {
    pub fn new(master_seed: u64, stream: Stream) -> Self {
        let derived_seed = master_seed ^ (stream as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15);
        Self {
            stream: stream.name(),
            inner:  Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Simplified Pareto draw; higher alpha = less skewed.
    pub fn pareto(&mut self, x_min: f64, alpha: f64) -> f64 {
        let u = self.next_f64().max(1e-10);
        x_min * u.powf(-1.0 / alpha)
    }
}

/// Stable stream assignments. Append only: reordering changes every seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum Stream {
    Activity = 0,
    Timing = 1,
    Amounts = 2,
}

impl Stream {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Activity => "activity",
            Self::Timing   => "timing",
            Self::Amounts  => "amounts",
        }
    }
}
