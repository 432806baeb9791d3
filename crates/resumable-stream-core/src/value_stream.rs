//! Deterministic value stream and running checksum.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Running checksum over delivered values.
///
/// A wrapping sum. It detects disagreement on the total but not reordering
/// or duplication.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Checksum(u32);

impl Checksum {
    /// Create an empty checksum.
    #[must_use]
    pub const fn new() -> Self {
        Self(0)
    }

    /// Fold one value into the checksum.
    pub const fn add(&mut self, value: u32) {
        self.0 = self.0.wrapping_add(value);
    }

    /// Current checksum value.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

/// Unbounded sequence of `u32` values fully determined by a seed.
///
/// Backed by ChaCha8, whose output is identical on every platform, so two
/// streams built from the same seed and advanced equally always agree.
#[derive(Debug, Clone)]
pub struct ValueStream {
    rng: ChaCha8Rng,
    drawn: u64,
}

impl ValueStream {
    /// Create a stream positioned at its first value.
    #[must_use]
    pub fn new(seed: i64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(u64::from_le_bytes(seed.to_le_bytes())),
            drawn: 0,
        }
    }

    /// Create a stream and silently draw `count` values from it.
    ///
    /// Returns the stream positioned after those values together with their
    /// checksum.
    #[must_use]
    pub fn replay(seed: i64, count: u32) -> (Self, Checksum) {
        let mut stream = Self::new(seed);
        let mut checksum = Checksum::new();
        for _ in 0..count {
            checksum.add(stream.next_value());
        }
        (stream, checksum)
    }

    /// Draw the next value.
    pub fn next_value(&mut self) -> u32 {
        self.drawn += 1;
        self.rng.next_u32()
    }

    /// Number of values drawn so far.
    #[must_use]
    pub const fn drawn(&self) -> u64 {
        self.drawn
    }
}

impl Iterator for ValueStream {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        Some(self.next_value())
    }
}
