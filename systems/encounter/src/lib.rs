#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic encounter generation.
//!
//! [`generate`] turns one 64-bit seed into an [`EncounterRecord`]. Its draw
//! order is fixed: identity constant, owner identity, personality values,
//! guaranteed stats, remaining stats, secondary trait, sex value, personality
//! trait. Every search depends on consuming exactly as many draws as the
//! simulation does, so the order must never change.
//!
//! A [`Spawner`] sits one level above: it receives a generator seed from the
//! spawn hierarchy, draws the slot value and the encounter seed from it, and
//! hands the encounter seed to [`generate`].

use encounter_oracle_core::{
    rarity_xor, Encounter, EncounterRecord, Xoroshiro128Plus, ALPHA_BAND_MIN, GENETIC_STAT_COUNT,
    GENETIC_STAT_MAX, OUTBREAK_SLOT_TOTAL, RARE_THRESHOLD,
};
use serde::{Deserialize, Serialize};

const FULL_RANGE: u64 = 0xFFFF_FFFF;
const STAT_RANGE: u64 = GENETIC_STAT_MAX as u64 + 1;
const SECONDARY_TRAIT_RANGE: u64 = 2;
const SEX_VALUE_RANGE: u64 = 252;
const PERSONALITY_TRAIT_RANGE: u64 = 25;
const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;

/// Generates the encounter seeded by `seed`.
///
/// Up to `confirmation_attempts` personality values are drawn, stopping at the
/// first rare one; the last value drawn is kept either way. A value of zero is
/// treated as one. `guaranteed_high_stats` distinct stats are forced to the
/// maximum before the rest are drawn; values above six are clamped.
#[must_use]
pub fn generate(
    seed: u64,
    confirmation_attempts: u32,
    guaranteed_high_stats: u32,
) -> EncounterRecord {
    let mut rng = Xoroshiro128Plus::new(seed);
    let identity_constant = draw_u32(&mut rng);
    let owner_identity = draw_u32(&mut rng);

    let mut personality_value = 0;
    for _ in 0..confirmation_attempts.max(1) {
        personality_value = draw_u32(&mut rng);
        if rarity_xor(personality_value, owner_identity) < RARE_THRESHOLD {
            break;
        }
    }

    let genetic_stats = draw_genetic_stats(&mut rng, guaranteed_high_stats);
    let secondary_trait = rng.bounded(SECONDARY_TRAIT_RANGE) as u8;
    let sex_value = rng.bounded(SEX_VALUE_RANGE) as u8 + 1;
    let personality_trait_index = rng.bounded(PERSONALITY_TRAIT_RANGE) as u8;

    EncounterRecord::new(
        identity_constant,
        owner_identity,
        personality_value,
        genetic_stats,
        secondary_trait,
        sex_value,
        personality_trait_index,
    )
}

fn draw_u32(rng: &mut Xoroshiro128Plus) -> u32 {
    rng.bounded(FULL_RANGE) as u32
}

fn draw_genetic_stats(
    rng: &mut Xoroshiro128Plus,
    guaranteed_high_stats: u32,
) -> [u8; GENETIC_STAT_COUNT] {
    let guaranteed = (guaranteed_high_stats as usize).min(GENETIC_STAT_COUNT);
    let mut fixed = [false; GENETIC_STAT_COUNT];
    let mut stats = [0u8; GENETIC_STAT_COUNT];

    for _ in 0..guaranteed {
        let mut index = rng.bounded(GENETIC_STAT_COUNT as u64) as usize;
        while fixed[index] {
            index = rng.bounded(GENETIC_STAT_COUNT as u64) as usize;
        }
        fixed[index] = true;
        stats[index] = GENETIC_STAT_MAX;
    }

    for (stat, is_fixed) in stats.iter_mut().zip(fixed) {
        if !is_fixed {
            *stat = rng.bounded(STAT_RANGE) as u8;
        }
    }

    stats
}

/// Scales a raw 64-bit draw into `[0, slot_total)`.
#[must_use]
pub fn slot_value(draw: u64, slot_total: f64) -> f64 {
    draw as f64 / TWO_POW_64 * slot_total
}

/// Turns a generator seed drawn from the hierarchy into one encounter.
pub trait Spawner {
    /// Produces the encounter for `generator_seed`.
    fn spawn(&self, generator_seed: u64) -> Encounter;

    /// Weight total the slot value is drawn out of.
    fn slot_total(&self) -> f64;
}

fn spawn_with(
    generator_seed: u64,
    slot_total: f64,
    confirmation_attempts: u32,
    guaranteed_high_stats: impl FnOnce(f64) -> u32,
) -> Encounter {
    let mut rng = Xoroshiro128Plus::new(generator_seed);
    let slot = slot_value(rng.next_u64(), slot_total);
    let seed = rng.next_u64();
    let record = generate(seed, confirmation_attempts, guaranteed_high_stats(slot));
    Encounter::new(generator_seed, seed, slot, record)
}

/// Spawner with a fixed candidate table and a fixed stat guarantee.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnerProfile {
    confirmation_attempts: u32,
    guaranteed_high_stats: u32,
    slot_total: f64,
}

impl SpawnerProfile {
    /// Creates a profile.
    #[must_use]
    pub const fn new(confirmation_attempts: u32, guaranteed_high_stats: u32, slot_total: f64) -> Self {
        Self {
            confirmation_attempts,
            guaranteed_high_stats,
            slot_total,
        }
    }

    /// Returns a copy drawing slots out of `slot_total`.
    #[must_use]
    pub const fn with_slot_total(self, slot_total: f64) -> Self {
        Self {
            confirmation_attempts: self.confirmation_attempts,
            guaranteed_high_stats: self.guaranteed_high_stats,
            slot_total,
        }
    }

    /// Personality draws allowed per encounter.
    #[must_use]
    pub const fn confirmation_attempts(&self) -> u32 {
        self.confirmation_attempts
    }

    /// Stats forced to the maximum.
    #[must_use]
    pub const fn guaranteed_high_stats(&self) -> u32 {
        self.guaranteed_high_stats
    }

    /// Sum of the candidate weights slots are drawn from.
    #[must_use]
    pub const fn slot_total(&self) -> f64 {
        self.slot_total
    }
}

impl Spawner for SpawnerProfile {
    fn spawn(&self, generator_seed: u64) -> Encounter {
        spawn_with(
            generator_seed,
            self.slot_total,
            self.confirmation_attempts,
            |_| self.guaranteed_high_stats,
        )
    }

    fn slot_total(&self) -> f64 {
        self.slot_total
    }
}

/// Spawner of a mass outbreak, whose alpha slot raises the stat guarantee.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutbreakProfile {
    confirmation_attempts: u32,
    alpha_guaranteed_high_stats: u32,
}

impl OutbreakProfile {
    /// Stat guarantee applied to alphas unless overridden.
    pub const DEFAULT_ALPHA_GUARANTEE: u32 = 3;

    /// Creates a profile with the default alpha guarantee.
    #[must_use]
    pub const fn new(confirmation_attempts: u32) -> Self {
        Self {
            confirmation_attempts,
            alpha_guaranteed_high_stats: Self::DEFAULT_ALPHA_GUARANTEE,
        }
    }

    /// Returns a copy with a different alpha guarantee.
    #[must_use]
    pub const fn with_alpha_guarantee(self, alpha_guaranteed_high_stats: u32) -> Self {
        Self {
            confirmation_attempts: self.confirmation_attempts,
            alpha_guaranteed_high_stats,
        }
    }

    /// Personality draws allowed per encounter.
    #[must_use]
    pub const fn confirmation_attempts(&self) -> u32 {
        self.confirmation_attempts
    }

    /// Stats forced to the maximum on alphas.
    #[must_use]
    pub const fn alpha_guaranteed_high_stats(&self) -> u32 {
        self.alpha_guaranteed_high_stats
    }
}

impl Spawner for OutbreakProfile {
    fn spawn(&self, generator_seed: u64) -> Encounter {
        spawn_with(
            generator_seed,
            OUTBREAK_SLOT_TOTAL,
            self.confirmation_attempts,
            |slot| {
                if slot >= ALPHA_BAND_MIN {
                    self.alpha_guaranteed_high_stats
                } else {
                    0
                }
            },
        )
    }

    fn slot_total(&self) -> f64 {
        OUTBREAK_SLOT_TOTAL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_value_scales_into_total() {
        assert_eq!(slot_value(0, 101.0), 0.0);
        assert_eq!(slot_value(1 << 63, 100.0), 50.0);
        assert!(slot_value(u64::MAX, 101.0) <= 101.0);
    }

    #[test]
    fn zero_attempts_still_draws_a_personality() {
        assert_eq!(generate(1, 0, 0), generate(1, 1, 0));
    }

    #[test]
    fn excess_guarantee_is_clamped() {
        assert_eq!(generate(1, 1, 9), generate(1, 1, 6));
    }
}
