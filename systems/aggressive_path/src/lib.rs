#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Depth-first enumeration of batch-action paths.
//!
//! After the initial batch, every batch action removes one to four
//! individuals; each removal draws one respawn and the group commits once the
//! batch has respawned. Every composition of the respawn count into such
//! batches is simulated from the group seed, and matching encounters are kept
//! once per seed no matter how many paths reach them.
//!
//! The initial batch and the respawns are produced by separate spawners:
//! outbreak alphas only receive guaranteed stats in the initial batch.

use std::collections::HashSet;

use encounter_oracle_core::{
    Encounter, FilterCriteria, Path, PathViolation, Population, SearchError, SearchOutcome,
    DEFAULT_ADVANCE_CEILING, INITIAL_POPULATION,
};
use encounter_oracle_hierarchy::SpawnHierarchy;
use encounter_oracle_system_encounter::Spawner;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Largest number of individuals one batch action removes.
pub const MAX_BATCH: u32 = 4;

/// Configuration parameters required to construct the aggressive search.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    population: Population,
    advance_ceiling: u32,
}

impl Config {
    /// Creates a configuration for groups of `population` individuals.
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

    /// Total group size.
    #[must_use]
    pub const fn population(&self) -> Population {
        self.population
    }

    /// Largest cycle advance evaluated by [`AggressivePathSearch::next_matching`].
    #[must_use]
    pub const fn advance_ceiling(&self) -> u32 {
        self.advance_ceiling
    }
}

/// Greedy path of full batches followed by the remainder; enumerated last.
#[must_use]
pub fn final_path(population: Population) -> Path {
    let respawns = population.respawns();
    let mut steps = vec![MAX_BATCH; (respawns / MAX_BATCH) as usize];
    if respawns % MAX_BATCH != 0 {
        steps.push(respawns % MAX_BATCH);
    }
    Path::new(steps)
}

/// Every batch path for a population, in lexicographic order.
#[derive(Clone, Debug)]
pub struct Compositions {
    target: u32,
    stack: Vec<(Vec<u32>, u32)>,
}

impl Compositions {
    /// Enumerates the batch paths that respawn all of `population`.
    #[must_use]
    pub fn new(population: Population) -> Self {
        Self {
            target: population.respawns(),
            stack: vec![(Vec::new(), 0)],
        }
    }
}

impl Iterator for Compositions {
    type Item = Path;

    fn next(&mut self) -> Option<Path> {
        while let Some((steps, sum)) = self.stack.pop() {
            if sum == self.target {
                return Some(Path::new(steps));
            }

            let largest = MAX_BATCH.min(self.target - sum);
            for batch in (1..=largest).rev() {
                let mut child = steps.clone();
                child.push(batch);
                self.stack.push((child, sum + batch));
            }
        }
        None
    }
}

/// One matching encounter and where it appeared.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggressiveMatch {
    encounter: Encounter,
    effective_path: Path,
    full_path: Path,
    spawn_number: u32,
}

impl AggressiveMatch {
    /// Matching encounter.
    #[must_use]
    pub const fn encounter(&self) -> &Encounter {
        &self.encounter
    }

    /// Actions needed to reach the encounter; empty for the initial batch.
    #[must_use]
    pub const fn effective_path(&self) -> &Path {
        &self.effective_path
    }

    /// Complete path that was being simulated.
    #[must_use]
    pub const fn full_path(&self) -> &Path {
        &self.full_path
    }

    /// One-based position of the encounter in the group's spawn order.
    #[must_use]
    pub const fn spawn_number(&self) -> u32 {
        self.spawn_number
    }
}

/// Structured result of enumerating every path from one group seed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggressiveReport {
    group_seed: u64,
    matches: Vec<AggressiveMatch>,
    paths_simulated: u32,
    covered: bool,
}

impl AggressiveReport {
    /// Group seed the paths were simulated from.
    #[must_use]
    pub const fn group_seed(&self) -> u64 {
        self.group_seed
    }

    /// Distinct matches in discovery order.
    #[must_use]
    pub fn matches(&self) -> &[AggressiveMatch] {
        &self.matches
    }

    /// Number of complete paths simulated.
    #[must_use]
    pub const fn paths_simulated(&self) -> u32 {
        self.paths_simulated
    }

    /// Whether enumeration reached the final path.
    #[must_use]
    pub const fn covered(&self) -> bool {
        self.covered
    }

    /// Whether no path produced a match.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// First cycle advance whose group seed produced a match.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdvanceMatch {
    advance: u32,
    report: AggressiveReport,
}

impl AdvanceMatch {
    /// Population cycles skipped before the matching group seed.
    #[must_use]
    pub const fn advance(&self) -> u32 {
        self.advance
    }

    /// Enumeration result at the matching group seed.
    #[must_use]
    pub const fn report(&self) -> &AggressiveReport {
        &self.report
    }
}

/// Pure depth-first search over aggressive paths.
#[derive(Clone, Copy, Debug)]
pub struct AggressivePathSearch {
    config: Config,
}

impl AggressivePathSearch {
    /// Creates a new search using the supplied configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Simulates every batch path from `group_seed`, drawing the initial
    /// batch with `initial` and every respawn with `respawn`.
    pub fn search<S: Spawner, R: Spawner>(
        &self,
        group_seed: u64,
        initial: &S,
        respawn: &R,
        filter: &FilterCriteria,
    ) -> Result<AggressiveReport, SearchError> {
        reject_invalid(filter, initial, respawn)?;
        Ok(self.enumerate(group_seed, initial, respawn, filter))
    }

    /// Simulates one explicit path, reporting every accepted encounter
    /// without deduplication.
    pub fn simulate_path<S: Spawner, R: Spawner>(
        &self,
        group_seed: u64,
        path: &Path,
        initial: &S,
        respawn: &R,
        filter: &FilterCriteria,
    ) -> Result<Vec<AggressiveMatch>, SearchError> {
        reject_invalid(filter, initial, respawn)?;
        path.expect_sum(self.config.population)?;
        if let Some((index, &step)) = path
            .steps()
            .iter()
            .enumerate()
            .find(|(_, step)| !(1..=MAX_BATCH).contains(*step))
        {
            return Err(SearchError::InvalidPath {
                path: path.clone(),
                violation: PathViolation::StepOutOfRange {
                    index,
                    step,
                    min: 1,
                    max: MAX_BATCH,
                },
            });
        }

        let mut matches = Vec::new();
        simulate(group_seed, path, (initial, respawn), filter, |found| {
            matches.push(found);
        });
        Ok(matches)
    }

    /// Searches successive group seeds, advancing `hierarchy` one population
    /// cycle at a time, until a seed yields a match or the ceiling is exceeded.
    ///
    /// `hierarchy` must sit at the start of a group: advance zero searches its
    /// current group seed. On a match it is left at the matching group; when
    /// the ceiling is exhausted it is restored to where it started.
    pub fn next_matching<S: Spawner, R: Spawner>(
        &self,
        hierarchy: &mut SpawnHierarchy,
        initial: &S,
        respawn: &R,
        filter: &FilterCriteria,
    ) -> Result<SearchOutcome<AdvanceMatch>, SearchError> {
        reject_invalid(filter, initial, respawn)?;

        let entry = hierarchy.snapshot();
        let ceiling = self.config.advance_ceiling;
        let mut group_seed = hierarchy.group_seed();
        for advance in 0..=ceiling {
            let report = self.enumerate(group_seed, initial, respawn, filter);
            if !report.is_empty() {
                info!(advance, group_seed, matches = report.matches.len(), "aggressive search matched");
                return Ok(SearchOutcome::Found(AdvanceMatch { advance, report }));
            }

            if advance < ceiling {
                group_seed = hierarchy.advance_cycle();
            }
        }

        hierarchy.restore(entry);
        info!(ceiling, "aggressive search exhausted its advance ceiling");
        Ok(SearchOutcome::Exhausted { ceiling })
    }

    fn enumerate<S: Spawner, R: Spawner>(
        &self,
        group_seed: u64,
        initial: &S,
        respawn: &R,
        filter: &FilterCriteria,
    ) -> AggressiveReport {
        let sentinel = final_path(self.config.population);
        let mut seen = HashSet::new();
        let mut report = AggressiveReport {
            group_seed,
            matches: Vec::new(),
            paths_simulated: 0,
            covered: false,
        };

        for path in Compositions::new(self.config.population) {
            simulate(group_seed, &path, (initial, respawn), filter, |found| {
                if seen.insert(found.encounter.seed()) {
                    report.matches.push(found);
                }
            });
            report.paths_simulated += 1;
            debug!(path = %path, matches = report.matches.len(), "aggressive path simulated");

            if path == sentinel {
                report.covered = true;
                break;
            }
        }

        report
    }
}

fn reject_invalid<S: Spawner, R: Spawner>(
    filter: &FilterCriteria,
    initial: &S,
    respawn: &R,
) -> Result<(), SearchError> {
    filter
        .validate_for(initial.slot_total())
        .and_then(|()| filter.validate_for(respawn.slot_total()))
        .map_err(|error| {
            warn!(%error, "aggressive search rejected");
            error
        })
}

fn simulate<S, R, F>(
    group_seed: u64,
    path: &Path,
    (initial, respawn): (&S, &R),
    filter: &FilterCriteria,
    mut emit: F,
) where
    S: Spawner,
    R: Spawner,
    F: FnMut(AggressiveMatch),
{
    let mut hierarchy = SpawnHierarchy::from_group_seed(group_seed);
    let mut observe = |encounter: Encounter, effective_path: Path, spawn_number| {
        if filter.accepts(&encounter) {
            emit(AggressiveMatch {
                encounter,
                effective_path,
                full_path: path.clone(),
                spawn_number,
            });
        }
    };

    for spawn_number in 1..=INITIAL_POPULATION {
        let encounter = initial.spawn(hierarchy.advance_one().generator_seed());
        observe(encounter, Path::default(), spawn_number);
    }
    let _ = hierarchy.commit();

    let steps = path.steps();
    let mut spawned = INITIAL_POPULATION;
    for (index, &batch) in steps.iter().enumerate() {
        for removed in 1..=batch {
            let mut effective = steps[..index].to_vec();
            effective.push(removed);
            let encounter = respawn.spawn(hierarchy.advance_one().generator_seed());
            observe(encounter, Path::new(effective), spawned + removed);
        }
        spawned += batch;
        let _ = hierarchy.commit();
    }
}
