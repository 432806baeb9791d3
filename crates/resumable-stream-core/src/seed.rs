//! Injectable randomness for minting session seeds.

use std::sync::{Mutex, PoisonError};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Source of fresh randomness for the protocol handlers.
///
/// Passed to handlers explicitly so tests can pin it to a fixed seed.
pub trait SeedSource: Send + Sync {
    /// Seed for a new stateful session.
    fn next_seed(&self) -> i64;

    /// Starting value for a stateless stream that has none.
    fn next_byte(&self) -> u8;
}

/// ChaCha-backed seed source.
#[derive(Debug)]
pub struct RngSeedSource {
    rng: Mutex<ChaCha8Rng>,
}

impl RngSeedSource {
    /// Create a reproducible source from a fixed seed.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }
}

impl SeedSource for RngSeedSource {
    fn next_seed(&self) -> i64 {
        let raw = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next_u64();
        i64::from_le_bytes(raw.to_le_bytes())
    }

    fn next_byte(&self) -> u8 {
        let mut buf = [0u8; 1];
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fill_bytes(&mut buf);
        buf[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_seed_is_reproducible() {
        let a = RngSeedSource::from_seed(2);
        let b = RngSeedSource::from_seed(2);
        for _ in 0..16 {
            assert_eq!(a.next_seed(), b.next_seed());
        }
        assert_eq!(a.next_byte(), b.next_byte());
    }

    #[test]
    fn test_known_draws_for_seed_two() {
        assert_eq!(RngSeedSource::from_seed(2).next_seed(), -2_188_877_197_642_949_691);
        assert_eq!(RngSeedSource::from_seed(2).next_byte(), 197);
    }

    #[test]
    fn test_successive_seeds_differ() {
        let source = RngSeedSource::from_seed(2);
        assert_ne!(source.next_seed(), source.next_seed());
    }
}
