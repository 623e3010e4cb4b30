//! Round-by-round search over a mass outbreak.
//!
//! A round spawns the initial batch from the outbreak's hierarchy, commits,
//! then draws every respawn from a secondary hierarchy seeded with the
//! committed group seed. The outbreak hierarchy advances one commit per round.

use encounter_oracle_core::{
    Encounter, FilterCriteria, Population, SearchError, SearchOutcome, DEFAULT_ADVANCE_CEILING,
    INITIAL_POPULATION,
};
use encounter_oracle_hierarchy::SpawnHierarchy;
use encounter_oracle_system_encounter::Spawner;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Configuration parameters required to construct the outbreak search.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MassOutbreakConfig {
    population: Population,
    advance_ceiling: u32,
}

impl MassOutbreakConfig {
    /// Creates a configuration for an outbreak of `population` individuals.
    #[must_use]
    pub const fn new(population: Population, advance_ceiling: u32) -> Self {
        Self {
            population,
            advance_ceiling,
        }
    }

    /// Creates a configuration with the default advance ceiling.
    #[must_use]
    pub const fn with_default_ceiling(population: Population) -> Self {
        Self::new(population, DEFAULT_ADVANCE_CEILING)
    }

    /// Total outbreak size.
    #[must_use]
    pub const fn population(&self) -> Population {
        self.population
    }

    /// Largest round index evaluated.
    #[must_use]
    pub const fn advance_ceiling(&self) -> u32 {
        self.advance_ceiling
    }
}

/// Position of an individual within a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpawnKind {
    /// Member of the initial batch.
    Initial {
        /// Zero-based position in the batch.
        index: u32,
    },
    /// Individual drawn after the initial batch.
    Respawn {
        /// Zero-based respawn number.
        index: u32,
    },
}

/// One individual of a simulated round.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutbreakSpawn {
    kind: SpawnKind,
    encounter: Encounter,
    matched: bool,
}

impl OutbreakSpawn {
    /// Where the individual appeared in the round.
    #[must_use]
    pub const fn kind(&self) -> SpawnKind {
        self.kind
    }

    /// Generated individual.
    #[must_use]
    pub const fn encounter(&self) -> &Encounter {
        &self.encounter
    }

    /// Whether the filter accepted the individual.
    #[must_use]
    pub const fn matched(&self) -> bool {
        self.matched
    }
}

/// Every individual produced by one round.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutbreakRound {
    group_seed: u64,
    spawns: Vec<OutbreakSpawn>,
}

impl OutbreakRound {
    /// Group seed committed after the initial batch; respawns derive from it.
    #[must_use]
    pub const fn group_seed(&self) -> u64 {
        self.group_seed
    }

    /// Initial batch followed by respawns, in spawn order.
    #[must_use]
    pub fn spawns(&self) -> &[OutbreakSpawn] {
        &self.spawns
    }

    /// Whether any individual matched.
    #[must_use]
    pub fn has_match(&self) -> bool {
        self.spawns.iter().any(OutbreakSpawn::matched)
    }

    /// Individuals the filter accepted.
    pub fn matches(&self) -> impl Iterator<Item = &OutbreakSpawn> {
        self.spawns.iter().filter(|spawn| spawn.matched)
    }
}

/// First round containing a match.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundMatch {
    advance: u32,
    round: OutbreakRound,
}

impl RoundMatch {
    /// Rounds skipped before the matching one.
    #[must_use]
    pub const fn advance(&self) -> u32 {
        self.advance
    }

    /// The matching round in full.
    #[must_use]
    pub const fn round(&self) -> &OutbreakRound {
        &self.round
    }
}

/// Pure search over the rounds of a mass outbreak.
#[derive(Clone, Copy, Debug)]
pub struct MassOutbreak {
    config: MassOutbreakConfig,
}

impl MassOutbreak {
    /// Creates a new outbreak search using the supplied configuration.
    #[must_use]
    pub const fn new(config: MassOutbreakConfig) -> Self {
        Self { config }
    }

    /// Simulates the next round of `hierarchy`, leaving it committed.
    pub fn simulate_round<S: Spawner>(
        &self,
        hierarchy: &mut SpawnHierarchy,
        spawner: &S,
        filter: &FilterCriteria,
    ) -> OutbreakRound {
        let population = self.config.population;
        let mut spawns = Vec::with_capacity(population.get() as usize);
        let mut record = |kind, generator_seed| {
            let encounter = spawner.spawn(generator_seed);
            spawns.push(OutbreakSpawn {
                kind,
                encounter,
                matched: filter.accepts(&encounter),
            });
        };

        for index in 0..INITIAL_POPULATION {
            let step = hierarchy.advance_one();
            record(SpawnKind::Initial { index }, step.generator_seed());
        }
        let group_seed = hierarchy.commit();

        let mut respawns = SpawnHierarchy::from_group_seed(group_seed);
        for index in 0..population.respawns() {
            let step = respawns.advance_one();
            let _ = respawns.commit();
            record(SpawnKind::Respawn { index }, step.generator_seed());
        }

        OutbreakRound { group_seed, spawns }
    }

    /// Simulates rounds until one contains a match or the ceiling is exceeded.
    ///
    /// On a match `hierarchy` is left committed past the matching round; when
    /// the ceiling is exhausted it is restored to the state it was passed in.
    /// Outbreak alphas receive no guaranteed stats, so `spawner` should carry
    /// a zero alpha guarantee.
    pub fn next_matching_round<S: Spawner>(
        &self,
        hierarchy: &mut SpawnHierarchy,
        spawner: &S,
        filter: &FilterCriteria,
    ) -> Result<SearchOutcome<RoundMatch>, SearchError> {
        if let Err(error) = filter.validate_for(spawner.slot_total()) {
            warn!(%error, "outbreak search rejected");
            return Err(error);
        }

        let entry = hierarchy.snapshot();
        let ceiling = self.config.advance_ceiling;
        for advance in 0..=ceiling {
            let round = self.simulate_round(hierarchy, spawner, filter);
            if round.has_match() {
                info!(advance, group_seed = round.group_seed, "outbreak round matched");
                return Ok(SearchOutcome::Found(RoundMatch { advance, round }));
            }
            debug!(advance, group_seed = round.group_seed, "outbreak round rejected");
        }

        hierarchy.restore(entry);
        info!(ceiling, "outbreak search exhausted its advance ceiling");
        Ok(SearchOutcome::Exhausted { ceiling })
    }
}
