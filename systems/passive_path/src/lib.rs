#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Breadth-first search over waypoint-revisit paths.
//!
//! A path lists how many single respawns to let through between waypoint
//! revisits. Every step that leaves respawns outstanding opens with a visible
//! batch of four drawn back-to-back and committed, then lets its `s` singles
//! through one at a time, committing after each. For the first step that batch
//! is the initial spawn; for later steps it is the field redrawn by the
//! revisit. The step that takes the last respawns draws exactly `s`
//! individuals straight on with neither a batch nor a commit. A one-step path
//! therefore draws only its own `s` individuals.
//!
//! Candidates are ranked by `len * (population + 1) + sum`. Simulation resumes
//! from the longest cached prefix so shared prefixes are only drawn once.

use std::collections::{BTreeMap, HashMap, VecDeque};

use encounter_oracle_core::{
    Encounter, FilterCriteria, Path, PathViolation, Population, SearchError, INITIAL_POPULATION,
};
use encounter_oracle_hierarchy::{HierarchySnapshot, SpawnHierarchy};
use encounter_oracle_system_encounter::Spawner;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const PROGRESS_INTERVAL: u32 = 16;

/// How far the search keeps going once a path has matched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchMode {
    /// Stop at the first complete path that produces a match.
    #[default]
    FirstMatch,
    /// Keep simulating paths that cost no more than the first match, so every
    /// path of the cheapest matching tier is reported.
    CheapestTier,
    /// Explore the whole bounded tree.
    Exhaustive,
}

/// Configuration parameters required to construct the passive search.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    population: Population,
    path_length_bound: usize,
    mode: SearchMode,
}

impl Config {
    /// Creates a configuration exploring paths of at most `path_length_bound` steps.
    #[must_use]
    pub const fn new(population: Population, path_length_bound: usize, mode: SearchMode) -> Self {
        Self {
            population,
            path_length_bound,
            mode,
        }
    }

    /// Total group size.
    #[must_use]
    pub const fn population(&self) -> Population {
        self.population
    }

    /// Longest path explored.
    #[must_use]
    pub const fn path_length_bound(&self) -> usize {
        self.path_length_bound
    }

    /// Search mode.
    #[must_use]
    pub const fn mode(&self) -> SearchMode {
        self.mode
    }
}

/// Cost used to rank paths for `population`.
#[must_use]
pub fn path_cost(path: &Path, population: Population) -> u64 {
    cost(path.len(), u64::from(path.sum()), population)
}

fn cost(len: usize, sum: u64, population: Population) -> u64 {
    len as u64 * (u64::from(population.get()) + 1) + sum
}

/// A matching encounter with every distinct path reaching it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PassiveMatch {
    encounter: Encounter,
    paths: Vec<Path>,
}

impl PassiveMatch {
    /// Matching encounter.
    #[must_use]
    pub const fn encounter(&self) -> &Encounter {
        &self.encounter
    }

    /// Paths producing the encounter, in discovery order.
    #[must_use]
    pub fn paths(&self) -> &[Path] {
        &self.paths
    }
}

/// Structured result of a passive search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PassiveReport {
    group_seed: u64,
    info: BTreeMap<u64, PassiveMatch>,
    candidates_simulated: u32,
    best_cost: Option<u64>,
}

impl PassiveReport {
    /// Group seed the search started from.
    #[must_use]
    pub const fn group_seed(&self) -> u64 {
        self.group_seed
    }

    /// Matches keyed by encounter seed.
    #[must_use]
    pub const fn info(&self) -> &BTreeMap<u64, PassiveMatch> {
        &self.info
    }

    /// Complete paths that were simulated.
    #[must_use]
    pub const fn candidates_simulated(&self) -> u32 {
        self.candidates_simulated
    }

    /// Cost of the cheapest matching path.
    #[must_use]
    pub const fn best_cost(&self) -> Option<u64> {
        self.best_cost
    }

    /// Whether no path produced a match.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.info.is_empty()
    }
}

/// Simulation state after some prefix of a path.
#[derive(Clone, Debug)]
struct Progress {
    snapshot: HierarchySnapshot,
    remaining: u32,
    matches: Vec<Encounter>,
}

impl Progress {
    fn start(group_seed: u64, population: Population) -> Self {
        Self {
            snapshot: SpawnHierarchy::from_group_seed(group_seed).snapshot(),
            remaining: population.respawns(),
            matches: Vec::new(),
        }
    }
}

struct Simulator<'a, S> {
    spawner: &'a S,
    filter: &'a FilterCriteria,
}

impl<S: Spawner> Simulator<'_, S> {
    fn spawn(&self, hierarchy: &mut SpawnHierarchy, matches: &mut Vec<Encounter>) {
        let encounter = self.spawner.spawn(hierarchy.advance_one().generator_seed());
        if self.filter.accepts(&encounter) {
            matches.push(encounter);
        }
    }

    /// Applies one step to the state left by the path's earlier steps.
    fn step(&self, progress: &mut Progress, step: u32) {
        let mut hierarchy = SpawnHierarchy::from_snapshot(progress.snapshot);

        if step == progress.remaining {
            for _ in 0..step {
                self.spawn(&mut hierarchy, &mut progress.matches);
            }
        } else {
            for _ in 0..INITIAL_POPULATION {
                self.spawn(&mut hierarchy, &mut progress.matches);
            }
            let _ = hierarchy.commit();

            for _ in 0..step {
                self.spawn(&mut hierarchy, &mut progress.matches);
                let _ = hierarchy.commit();
            }
        }

        progress.remaining -= step;
        progress.snapshot = hierarchy.snapshot();
    }
}

/// Frontier entry of the breadth-first search.
struct Node {
    steps: Vec<u32>,
    remaining: u32,
}

/// Pure breadth-first search over passive paths.
#[derive(Clone, Copy, Debug)]
pub struct PassivePathSearch {
    config: Config,
}

impl PassivePathSearch {
    /// Creates a new search using the supplied configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Explores paths up to the length bound starting at `group_seed`, in
    /// order of increasing cost.
    pub fn search<S: Spawner>(
        &self,
        group_seed: u64,
        spawner: &S,
        filter: &FilterCriteria,
    ) -> Result<PassiveReport, SearchError> {
        if let Err(error) = filter.validate_for(spawner.slot_total()) {
            warn!(%error, "passive search rejected");
            return Err(error);
        }

        let population = self.config.population;
        let mode = self.config.mode;
        let simulator = Simulator { spawner, filter };
        let root = Progress::start(group_seed, population);
        let mut cache: HashMap<Vec<u32>, Progress> = HashMap::new();

        let mut report = PassiveReport {
            group_seed,
            info: BTreeMap::new(),
            candidates_simulated: 0,
            best_cost: None,
        };
        let mut frontier = VecDeque::from([Node {
            steps: Vec::new(),
            remaining: population.respawns(),
        }]);

        while let Some(node) = frontier.pop_front() {
            let len = node.steps.len();
            let complete = node.remaining == 0;
            let lower_bound = if complete {
                cost(len, u64::from(population.respawns()), population)
            } else {
                cost(len + 1, u64::from(population.respawns()), population)
            };

            if let Some(best) = report.best_cost {
                match mode {
                    SearchMode::FirstMatch => break,
                    SearchMode::CheapestTier if lower_bound > best => continue,
                    SearchMode::CheapestTier | SearchMode::Exhaustive => {}
                }
            }

            if complete {
                let matches = resume(&simulator, &root, &mut cache, &node.steps);
                report.candidates_simulated += 1;
                if report.candidates_simulated % PROGRESS_INTERVAL == 0 {
                    debug!(
                        candidates = report.candidates_simulated,
                        frontier = frontier.len(),
                        "passive search progress"
                    );
                }

                if !matches.is_empty() {
                    report.best_cost = Some(
                        report
                            .best_cost
                            .map_or(lower_bound, |best| best.min(lower_bound)),
                    );
                    record(&mut report.info, matches, Path::new(node.steps));
                }
                continue;
            }

            if len >= self.config.path_length_bound {
                continue;
            }

            for step in 0..=node.remaining {
                let mut steps = node.steps.clone();
                steps.push(step);
                frontier.push_back(Node {
                    steps,
                    remaining: node.remaining - step,
                });
            }
        }

        info!(
            group_seed,
            candidates = report.candidates_simulated,
            matches = report.info.len(),
            best_cost = ?report.best_cost,
            "passive search finished"
        );
        Ok(report)
    }

    /// Simulates one explicit path and returns the accepted encounters in
    /// spawn order.
    pub fn simulate_path<S: Spawner>(
        &self,
        group_seed: u64,
        path: &Path,
        spawner: &S,
        filter: &FilterCriteria,
    ) -> Result<Vec<Encounter>, SearchError> {
        filter.validate_for(spawner.slot_total())?;
        validate_path(path, self.config.population)?;

        let simulator = Simulator { spawner, filter };
        let mut progress = Progress::start(group_seed, self.config.population);
        for &step in path.steps() {
            simulator.step(&mut progress, step);
        }
        Ok(progress.matches)
    }
}

fn resume<S: Spawner>(
    simulator: &Simulator<'_, S>,
    root: &Progress,
    cache: &mut HashMap<Vec<u32>, Progress>,
    steps: &[u32],
) -> Vec<Encounter> {
    let (start, mut progress) = (1..steps.len())
        .rev()
        .find_map(|len| cache.get(&steps[..len]).map(|cached| (len, cached.clone())))
        .unwrap_or_else(|| (0, root.clone()));

    for (index, &step) in steps.iter().enumerate().skip(start) {
        simulator.step(&mut progress, step);
        if index + 1 < steps.len() {
            let _ = cache.insert(steps[..=index].to_vec(), progress.clone());
        }
    }
    progress.matches
}

fn record(info: &mut BTreeMap<u64, PassiveMatch>, matches: Vec<Encounter>, path: Path) {
    for encounter in matches {
        let entry = info.entry(encounter.seed()).or_insert_with(|| PassiveMatch {
            encounter,
            paths: Vec::new(),
        });
        if !entry.paths.contains(&path) {
            entry.paths.push(path.clone());
        }
    }
}

fn validate_path(path: &Path, population: Population) -> Result<(), SearchError> {
    path.expect_sum(population)?;

    // Partial sums never exceed the total, so only steps after the last
    // respawn can be out of place.
    let mut remaining = population.respawns();
    for (index, &step) in path.steps().iter().enumerate() {
        if index > 0 && remaining == 0 {
            return Err(SearchError::InvalidPath {
                path: path.clone(),
                violation: PathViolation::TrailingStep { index },
            });
        }
        remaining -= step;
    }
    Ok(())
}
