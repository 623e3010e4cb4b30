#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Bounded linear search that walks a spawn hierarchy one reseed at a time
//! until a spawner produces an encounter accepted by the filter.

mod outbreak;

use std::fmt;

use encounter_oracle_core::{
    Encounter, FilterCriteria, LinearMatch, SearchError, SearchOutcome, DEFAULT_ADVANCE_CEILING,
};
use encounter_oracle_hierarchy::SpawnHierarchy;
use encounter_oracle_system_encounter::{Spawner, SpawnerProfile};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use outbreak::{MassOutbreak, MassOutbreakConfig, OutbreakRound, OutbreakSpawn, RoundMatch, SpawnKind};

const PROGRESS_INTERVAL: u32 = 1000;

/// Configuration parameters required to construct the linear search.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    advance_ceiling: u32,
    initial_spawn: bool,
}

impl Config {
    /// Creates a configuration bounding the search at `advance_ceiling`.
    ///
    /// When `initial_spawn` is false the spawn-formation step is consumed
    /// before the first advance is evaluated.
    #[must_use]
    pub const fn new(advance_ceiling: u32, initial_spawn: bool) -> Self {
        Self {
            advance_ceiling,
            initial_spawn,
        }
    }

    /// Largest advance count evaluated.
    #[must_use]
    pub const fn advance_ceiling(&self) -> u32 {
        self.advance_ceiling
    }

    /// Whether the group is still at its initial spawn.
    #[must_use]
    pub const fn initial_spawn(&self) -> bool {
        self.initial_spawn
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_ADVANCE_CEILING, true)
    }
}

/// One spawner handed to [`LinearSearch::scan`].
#[derive(Clone, Debug)]
pub struct ScanTarget<K> {
    key: K,
    hierarchy: SpawnHierarchy,
    profile: SpawnerProfile,
    filter: FilterCriteria,
}

impl<K> ScanTarget<K> {
    /// Bundles a spawner's hierarchy, profile and filter under `key`.
    #[must_use]
    pub const fn new(
        key: K,
        hierarchy: SpawnHierarchy,
        profile: SpawnerProfile,
        filter: FilterCriteria,
    ) -> Self {
        Self {
            key,
            hierarchy,
            profile,
            filter,
        }
    }
}

/// Spawner reported by [`LinearSearch::scan`] as matching within the ceiling.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScanHit<K> {
    key: K,
    found: LinearMatch,
}

impl<K> ScanHit<K> {
    /// Key the spawner was submitted under.
    #[must_use]
    pub const fn key(&self) -> &K {
        &self.key
    }

    /// First matching advance of the spawner.
    #[must_use]
    pub const fn found(&self) -> &LinearMatch {
        &self.found
    }
}

/// Pure search over a single spawner's hierarchy.
#[derive(Clone, Copy, Debug, Default)]
pub struct LinearSearch {
    config: Config,
}

impl LinearSearch {
    /// Creates a new search using the supplied configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Configuration the search was created with.
    #[must_use]
    pub const fn config(&self) -> Config {
        self.config
    }

    /// Advances `hierarchy` until `profile` spawns an encounter `filter`
    /// accepts, or the advance ceiling is exceeded.
    ///
    /// On a match the hierarchy is left holding the matching step, before its
    /// reseed. When the ceiling is exhausted the hierarchy is restored to the
    /// state it was passed in. Filters that can never match are rejected
    /// before any draw.
    pub fn next_filtered(
        &self,
        hierarchy: &mut SpawnHierarchy,
        profile: SpawnerProfile,
        filter: &FilterCriteria,
    ) -> Result<SearchOutcome<LinearMatch>, SearchError> {
        let spawner = prepare_spawner(profile, filter)?;
        let entry = hierarchy.snapshot();
        if !self.config.initial_spawn {
            hierarchy.skip_spawn_formation();
        }

        let ceiling = self.config.advance_ceiling;
        for advance in 0..=ceiling {
            let step = hierarchy.advance_one();
            let encounter = spawner.spawn(step.generator_seed());
            if filter.accepts(&encounter) {
                info!(advance, seed = encounter.seed(), "linear search matched");
                return Ok(SearchOutcome::Found(LinearMatch::new(advance, encounter)));
            }

            if advance % PROGRESS_INTERVAL == 0 {
                debug!(advance, group_seed = hierarchy.group_seed(), "linear search progress");
            }
            let _ = hierarchy.commit();
        }

        hierarchy.restore(entry);
        info!(ceiling, "linear search exhausted its advance ceiling");
        Ok(SearchOutcome::Exhausted { ceiling })
    }

    /// Encounter the spawner would produce at advance zero, leaving the
    /// caller's hierarchy untouched.
    #[must_use]
    pub fn current(&self, hierarchy: &SpawnHierarchy, profile: SpawnerProfile) -> Encounter {
        let mut preview = hierarchy.clone();
        if !self.config.initial_spawn {
            preview.skip_spawn_formation();
        }
        profile.spawn(preview.advance_one().generator_seed())
    }

    /// Searches every target and reports those matching within the ceiling.
    ///
    /// Targets whose filter is rejected are skipped.
    pub fn scan<K, I>(&self, targets: I) -> Vec<ScanHit<K>>
    where
        K: fmt::Debug,
        I: IntoIterator<Item = ScanTarget<K>>,
    {
        let mut hits = Vec::new();
        for target in targets {
            let ScanTarget {
                key,
                mut hierarchy,
                profile,
                filter,
            } = target;

            match self.next_filtered(&mut hierarchy, profile, &filter) {
                Ok(SearchOutcome::Found(found)) => hits.push(ScanHit { key, found }),
                Ok(SearchOutcome::Exhausted { .. }) => {}
                Err(error) => debug!(?key, %error, "skipping spawner"),
            }
        }
        hits
    }
}

fn prepare_spawner(
    profile: SpawnerProfile,
    filter: &FilterCriteria,
) -> Result<SpawnerProfile, SearchError> {
    if let Err(error) = filter.validate() {
        warn!(%error, "linear search rejected");
        return Err(error);
    }

    let slot_total = filter
        .slot_range()
        .map_or(profile.slot_total(), |range| range.total());
    if slot_total.is_nan() || slot_total <= 0.0 {
        warn!(slot_total, "linear search rejected: no slot weight");
        return Err(SearchError::ImpossibleFilter);
    }

    Ok(profile.with_slot_total(slot_total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use encounter_oracle_core::SlotRange;

    #[test]
    fn filter_total_overrides_profile_total() {
        let profile = SpawnerProfile::new(1, 0, 100.0);
        let filter = FilterCriteria::new().with_slot_range(SlotRange::new(5.0, 10.0, 40.0));

        let prepared = prepare_spawner(profile, &filter).expect("filter is satisfiable");
        assert_eq!(prepared.slot_total(), 40.0);
    }

    #[test]
    fn zero_weight_profile_is_impossible() {
        let profile = SpawnerProfile::new(1, 0, 0.0);

        assert_eq!(
            prepare_spawner(profile, &FilterCriteria::new()),
            Err(SearchError::ImpossibleFilter)
        );
    }
}
