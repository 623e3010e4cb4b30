#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Spawn hierarchy model.
//!
//! A spawn group owns one generator seeded from its group seed. Every step
//! draws a generator seed for one individual and a companion seed that is
//! never consumed but keeps the stream aligned with the simulation. After a
//! population unit completes the group reseeds itself from a fresh draw; that
//! reseed is the only externally observable commit. Searches branch by taking
//! a [`HierarchySnapshot`] and restoring it, never by sharing the live state.

use encounter_oracle_core::{Xoroshiro128Plus, INITIAL_POPULATION, SEED_CONSTANT};
use serde::{Deserialize, Serialize};

/// Converts the raw generator value read from the live source into a group seed.
#[must_use]
pub const fn derive_group_seed(raw_seed: u64) -> u64 {
    raw_seed.wrapping_sub(SEED_CONSTANT)
}

/// Seeds produced by one hierarchy step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpawnStep {
    generator_seed: u64,
    companion_seed: u64,
}

impl SpawnStep {
    /// Seed handed to the individual's spawner.
    #[must_use]
    pub const fn generator_seed(&self) -> u64 {
        self.generator_seed
    }

    /// Structurally drawn seed that nothing downstream consumes.
    #[must_use]
    pub const fn companion_seed(&self) -> u64 {
        self.companion_seed
    }
}

/// Value copy of a hierarchy's full state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HierarchySnapshot {
    rng: Xoroshiro128Plus,
    group_seed: u64,
}

/// Stateful generator chain of one spawn group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpawnHierarchy {
    rng: Xoroshiro128Plus,
    group_seed: u64,
}

impl SpawnHierarchy {
    /// Starts a hierarchy at the provided group seed.
    #[must_use]
    pub const fn from_group_seed(group_seed: u64) -> Self {
        Self {
            rng: Xoroshiro128Plus::new(group_seed),
            group_seed,
        }
    }

    /// Starts a hierarchy from the raw value stored by the live source.
    #[must_use]
    pub const fn from_raw_seed(raw_seed: u64) -> Self {
        Self::from_group_seed(derive_group_seed(raw_seed))
    }

    /// Recreates the hierarchy captured by `snapshot`.
    #[must_use]
    pub const fn from_snapshot(snapshot: HierarchySnapshot) -> Self {
        Self {
            rng: snapshot.rng,
            group_seed: snapshot.group_seed,
        }
    }

    /// Group seed the hierarchy was last seeded with.
    #[must_use]
    pub const fn group_seed(&self) -> u64 {
        self.group_seed
    }

    /// Draws the seed pair for the next individual.
    pub fn advance_one(&mut self) -> SpawnStep {
        let generator_seed = self.rng.next_u64();
        let companion_seed = self.rng.next_u64();
        SpawnStep {
            generator_seed,
            companion_seed,
        }
    }

    /// Reseeds the group from a fresh draw and returns the new group seed.
    pub fn commit(&mut self) -> u64 {
        let group_seed = self.rng.next_u64();
        self.rng.reseed(group_seed);
        self.group_seed = group_seed;
        group_seed
    }

    /// Consumes the spawn-formation step the simulation performs before
    /// searching begins when the group is not at its initial spawn.
    pub fn skip_spawn_formation(&mut self) {
        let _ = self.advance_one();
        let _ = self.commit();
    }

    /// Runs one full initial-population cycle and reseeds, returning the
    /// group seed of the next cycle.
    pub fn advance_cycle(&mut self) -> u64 {
        for _ in 0..INITIAL_POPULATION {
            let _ = self.advance_one();
        }
        self.commit()
    }

    /// Captures the current state.
    #[must_use]
    pub const fn snapshot(&self) -> HierarchySnapshot {
        HierarchySnapshot {
            rng: self.rng,
            group_seed: self.group_seed,
        }
    }

    /// Restores a previously captured state.
    pub fn restore(&mut self, snapshot: HierarchySnapshot) {
        self.rng = snapshot.rng;
        self.group_seed = snapshot.group_seed;
    }
}
