//! Deterministic seeded randomness for the LRU preload step (§4.D).
//!
//! The teacher's `shared/rand` is a lock-free, process-lifetime
//! generator built for throughput. That property is exactly wrong
//! here: the preload step must be reproducible given the same
//! collection name, so this reseeds per collection instead (§9 "Global
//! state": "Randomness used for the LRU preload must be seeded
//! deterministically per collection name").

use rand::rngs::StdRng;
use rand::SeedableRng;

/// A fresh RNG seeded from the stable hash of `collection`. Calling
/// this twice for the same name always yields generators that produce
/// the same sequence.
pub fn seeded_rng(collection: &str) -> StdRng {
    let seed = crate::estimator::hashing::stable_hash(collection.as_bytes());
    StdRng::seed_from_u64(seed)
}

#[cfg(test)]
mod rand_test {
    use super::*;
    use rand::Rng;

    #[test]
    fn same_collection_name_yields_same_sequence() {
        let mut a = seeded_rng("orders");
        let mut b = seeded_rng("orders");
        let sample_a: u64 = a.gen();
        let sample_b: u64 = b.gen();
        assert_eq!(sample_a, sample_b);
    }

    #[test]
    fn different_names_yield_different_seeds() {
        let mut a = seeded_rng("orders");
        let mut b = seeded_rng("users");
        let sample_a: u64 = a.gen();
        let sample_b: u64 = b.gen();
        assert_ne!(sample_a, sample_b);
    }
}
