use serde::{Deserialize, Serialize};

use crate::SEED_CONSTANT;

/// xoroshiro128+ generator matching the simulation's own random stream.
///
/// The state is two 64-bit words. Every draw advances it by one XOR/rotate/shift
/// step and returns the wrapping sum of the pre-step words. [`previous_u64`]
/// undoes exactly one step, so the stream can be walked in both directions.
///
/// [`previous_u64`]: Xoroshiro128Plus::previous_u64
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Xoroshiro128Plus {
    s0: u64,
    s1: u64,
}

impl Xoroshiro128Plus {
    /// Creates a generator whose second word is the fixed [`SEED_CONSTANT`].
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self::from_state(seed, SEED_CONSTANT)
    }

    /// Creates a generator from both state words.
    #[must_use]
    pub const fn from_state(s0: u64, s1: u64) -> Self {
        Self { s0, s1 }
    }

    /// Current state words.
    #[must_use]
    pub const fn state(&self) -> (u64, u64) {
        (self.s0, self.s1)
    }

    /// Replaces the state in place, discarding all history.
    pub fn reseed(&mut self, seed: u64) {
        self.reseed_with(seed, SEED_CONSTANT);
    }

    /// Replaces both state words in place.
    pub fn reseed_with(&mut self, s0: u64, s1: u64) {
        self.s0 = s0;
        self.s1 = s1;
    }

    /// Advances the state and returns the next 64-bit output.
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.s0;
        let mut s1 = self.s1;
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.s0 = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.s1 = s1.rotate_left(37);
        result
    }

    /// Steps the state backwards and returns the output of the undone draw.
    pub fn previous_u64(&mut self) -> u64 {
        let s1 = self.s1.rotate_right(37);
        let s0 = (self.s0 ^ s1 ^ (s1 << 16)).rotate_right(24);

        self.s0 = s0;
        self.s1 = s1 ^ s0;
        self.s0.wrapping_add(self.s1)
    }

    /// Lower 32 bits of the next output.
    pub fn next_u32(&mut self) -> u32 {
        (self.next_u64() & u64::from(u32::MAX)) as u32
    }

    /// Returns a value uniformly distributed in `[0, max)`.
    ///
    /// Draws are masked to the smallest all-ones value covering `max - 1` and
    /// rejected until one lands below `max`, consuming exactly as many outputs
    /// as the simulation does.
    ///
    /// # Panics
    ///
    /// Panics when `max` is zero.
    pub fn bounded(&mut self, max: u64) -> u64 {
        assert!(max > 0, "bounded requires a non-zero maximum");
        let mask = rejection_mask(max);
        loop {
            let value = self.next_u64() & mask;
            if value < max {
                return value;
            }
        }
    }
}

const fn rejection_mask(max: u64) -> u64 {
    let mut mask = max - 1;
    mask |= mask >> 1;
    mask |= mask >> 2;
    mask |= mask >> 4;
    mask |= mask >> 8;
    mask |= mask >> 16;
    mask |= mask >> 32;
    mask
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_mask_covers_maximum() {
        assert_eq!(rejection_mask(1), 0);
        assert_eq!(rejection_mask(2), 1);
        assert_eq!(rejection_mask(6), 7);
        assert_eq!(rejection_mask(32), 31);
        assert_eq!(rejection_mask(252), 255);
        assert_eq!(rejection_mask(0xFFFF_FFFF), 0xFFFF_FFFF);
    }

    #[test]
    fn output_is_wrapping_sum_of_words() {
        let mut rng = Xoroshiro128Plus::from_state(u64::MAX, 2);
        assert_eq!(rng.next_u64(), 1);
    }

    #[test]
    fn zero_state_is_a_fixed_point() {
        let mut rng = Xoroshiro128Plus::from_state(0, 0);
        assert_eq!(rng.next_u64(), 0);
        assert_eq!(rng.state(), (0, 0));
    }
}
