//! Reproducible, per-worker random number generation.
//!
//! Photon emission and secondary-ray sampling must be reproducible across
//! parallel runs, so every worker gets its own RNG seeded deterministically
//! from a base seed and the worker's index — never from wall-clock time.

use rand::rngs::SmallRng;
use rand::SeedableRng;

/// Derives a worker-local seed from a base seed and a worker index, using a
/// fixed-point mix so nearby worker indices do not produce correlated
/// streams.
pub fn worker_seed(base_seed: u64, worker_index: u64) -> u64 {
    base_seed
        .wrapping_mul(0x9E3779B97F4A7C15)
        .wrapping_add(worker_index.wrapping_mul(0xBF58476D1CE4E5B9))
}

pub fn worker_rng(base_seed: u64, worker_index: u64) -> SmallRng {
    SmallRng::seed_from_u64(worker_seed(base_seed, worker_index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_workers_get_distinct_seeds() {
        assert_ne!(worker_seed(42, 0), worker_seed(42, 1));
    }

    #[test]
    fn same_inputs_are_deterministic() {
        assert_eq!(worker_seed(42, 3), worker_seed(42, 3));
    }
}
