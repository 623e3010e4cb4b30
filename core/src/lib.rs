#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the encounter oracle.
//!
//! This crate defines the vocabulary every other crate speaks. The
//! [`Xoroshiro128Plus`] engine is the single source of randomness; the spawn
//! hierarchy draws generator seeds from it, the encounter generator turns
//! those seeds into [`EncounterRecord`] values, and the search systems test
//! each resulting [`Encounter`] against an immutable [`FilterCriteria`].
//! Searches report structured values ([`SearchOutcome`], [`LinearMatch`],
//! [`Path`]) and leave all formatting to the presentation boundary.

mod rng;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use rng::Xoroshiro128Plus;

/// Second state word used whenever a generator is seeded from a single value.
///
/// The live source stores group seeds offset by the same constant, see
/// `derive_group_seed` in the hierarchy crate.
pub const SEED_CONSTANT: u64 = 0x82A2_B175_229D_6A5B;

/// Number of individuals spawned together when a spawn group first forms.
pub const INITIAL_POPULATION: u32 = 4;

/// Encounters whose identity xor falls below this value are rare.
pub const RARE_THRESHOLD: u32 = 16;

/// Number of genetic stats carried by every encounter.
pub const GENETIC_STAT_COUNT: usize = 6;

/// Maximum value of a single genetic stat.
pub const GENETIC_STAT_MAX: u8 = 31;

/// Slot total used by mass-outbreak spawners.
pub const OUTBREAK_SLOT_TOTAL: f64 = 101.0;

/// Inclusive lower bound of the alpha slot band.
pub const ALPHA_BAND_MIN: f64 = 100.0;

/// Exclusive upper bound of the alpha slot band.
pub const ALPHA_BAND_MAX: f64 = 101.0;

/// Advance ceiling applied when callers do not supply one.
pub const DEFAULT_ADVANCE_CEILING: u32 = 50_000;

/// Computes the identity xor that decides rarity.
#[must_use]
pub const fn rarity_xor(personality_value: u32, owner_identity: u32) -> u32 {
    (personality_value >> 16)
        ^ (owner_identity >> 16)
        ^ (personality_value & 0xFFFF)
        ^ (owner_identity & 0xFFFF)
}

/// Rarity grade derived from the identity xor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rarity {
    /// The xor reached the rare threshold.
    Common,
    /// Rare with a non-zero xor.
    Star,
    /// Rare with a xor of exactly zero.
    Square,
}

impl Rarity {
    /// Grades the pairing of a personality value with an owner identity.
    #[must_use]
    pub const fn from_ids(personality_value: u32, owner_identity: u32) -> Self {
        match rarity_xor(personality_value, owner_identity) {
            0 => Self::Square,
            xor if xor < RARE_THRESHOLD => Self::Star,
            _ => Self::Common,
        }
    }

    /// Reports whether the grade counts as rare.
    #[must_use]
    pub const fn is_rare(self) -> bool {
        !matches!(self, Self::Common)
    }
}

/// Complete attribute set produced by one generation call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncounterRecord {
    identity_constant: u32,
    owner_identity: u32,
    personality_value: u32,
    genetic_stats: [u8; GENETIC_STAT_COUNT],
    secondary_trait: u8,
    sex_value: u8,
    personality_trait_index: u8,
    is_rare: bool,
}

impl EncounterRecord {
    /// Assembles a record; rarity is derived from the identity fields.
    #[must_use]
    pub const fn new(
        identity_constant: u32,
        owner_identity: u32,
        personality_value: u32,
        genetic_stats: [u8; GENETIC_STAT_COUNT],
        secondary_trait: u8,
        sex_value: u8,
        personality_trait_index: u8,
    ) -> Self {
        Self {
            identity_constant,
            owner_identity,
            personality_value,
            genetic_stats,
            secondary_trait,
            sex_value,
            personality_trait_index,
            is_rare: rarity_xor(personality_value, owner_identity) < RARE_THRESHOLD,
        }
    }

    /// Identity constant drawn first from the generator.
    #[must_use]
    pub const fn identity_constant(&self) -> u32 {
        self.identity_constant
    }

    /// Owner identity pair baked into the seed sequence.
    #[must_use]
    pub const fn owner_identity(&self) -> u32 {
        self.owner_identity
    }

    /// Last personality value drawn during rarity confirmation.
    #[must_use]
    pub const fn personality_value(&self) -> u32 {
        self.personality_value
    }

    /// Six genetic stats, each in `0..=31`.
    #[must_use]
    pub const fn genetic_stats(&self) -> [u8; GENETIC_STAT_COUNT] {
        self.genetic_stats
    }

    /// Secondary trait, either 0 or 1.
    #[must_use]
    pub const fn secondary_trait(&self) -> u8 {
        self.secondary_trait
    }

    /// Sex value in `1..=252`.
    #[must_use]
    pub const fn sex_value(&self) -> u8 {
        self.sex_value
    }

    /// Personality trait index in `0..25`.
    #[must_use]
    pub const fn personality_trait_index(&self) -> u8 {
        self.personality_trait_index
    }

    /// Whether the encounter is rare.
    #[must_use]
    pub const fn is_rare(&self) -> bool {
        self.is_rare
    }

    /// Rarity grade of the encounter.
    #[must_use]
    pub const fn rarity(&self) -> Rarity {
        Rarity::from_ids(self.personality_value, self.owner_identity)
    }
}

/// One individual produced by a spawner from a generator seed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Encounter {
    generator_seed: u64,
    seed: u64,
    slot: f64,
    record: EncounterRecord,
}

impl Encounter {
    /// Creates an encounter description.
    #[must_use]
    pub const fn new(generator_seed: u64, seed: u64, slot: f64, record: EncounterRecord) -> Self {
        Self {
            generator_seed,
            seed,
            slot,
            record,
        }
    }

    /// Generator seed drawn from the spawn hierarchy.
    #[must_use]
    pub const fn generator_seed(&self) -> u64 {
        self.generator_seed
    }

    /// Seed consumed by the encounter generator; identifies the encounter.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Slot value used to select the candidate identity.
    #[must_use]
    pub const fn slot(&self) -> f64 {
        self.slot
    }

    /// Generated attributes.
    #[must_use]
    pub const fn record(&self) -> &EncounterRecord {
        &self.record
    }

    /// Whether the slot value falls in the alpha band.
    #[must_use]
    pub fn is_alpha(&self) -> bool {
        (ALPHA_BAND_MIN..ALPHA_BAND_MAX).contains(&self.slot)
    }
}

/// Half-open slot interval `[min, max)` out of a weight `total`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlotRange {
    min: f64,
    max: f64,
    total: f64,
}

impl SlotRange {
    /// Creates a range; validity is checked by [`FilterCriteria::validate`].
    #[must_use]
    pub const fn new(min: f64, max: f64, total: f64) -> Self {
        Self { min, max, total }
    }

    /// Range that accepts nothing out of nothing.
    #[must_use]
    pub const fn empty() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Inclusive lower bound.
    #[must_use]
    pub const fn min(&self) -> f64 {
        self.min
    }

    /// Exclusive upper bound.
    #[must_use]
    pub const fn max(&self) -> f64 {
        self.max
    }

    /// Sum of every candidate weight.
    #[must_use]
    pub const fn total(&self) -> f64 {
        self.total
    }

    /// Whether `slot` falls inside the range.
    #[must_use]
    pub fn contains(&self, slot: f64) -> bool {
        self.min <= slot && slot < self.max
    }

    /// Whether the range can never accept a slot.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total <= 0.0 || self.max <= self.min
    }

    /// Share of the total covered by the range, in percent.
    #[must_use]
    pub fn share_percent(&self) -> f64 {
        if self.total <= 0.0 {
            return 0.0;
        }
        (self.max - self.min) / self.total * 100.0
    }
}

/// Immutable acceptance criteria, built fresh for each search invocation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    require_rare: bool,
    slot_range: Option<SlotRange>,
    require_alpha: bool,
}

impl FilterCriteria {
    /// Filter that accepts every encounter.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            require_rare: false,
            slot_range: None,
            require_alpha: false,
        }
    }

    /// Returns a copy that requires (or stops requiring) rare encounters.
    #[must_use]
    pub const fn with_rare(self, require_rare: bool) -> Self {
        Self {
            require_rare,
            slot_range: self.slot_range,
            require_alpha: self.require_alpha,
        }
    }

    /// Returns a copy that requires the slot value to fall inside `range`.
    #[must_use]
    pub const fn with_slot_range(self, range: SlotRange) -> Self {
        Self {
            require_rare: self.require_rare,
            slot_range: Some(range),
            require_alpha: self.require_alpha,
        }
    }

    /// Returns a copy that requires (or stops requiring) the alpha band.
    #[must_use]
    pub const fn with_alpha(self, require_alpha: bool) -> Self {
        Self {
            require_rare: self.require_rare,
            slot_range: self.slot_range,
            require_alpha,
        }
    }

    /// Whether rare encounters are required.
    #[must_use]
    pub const fn require_rare(&self) -> bool {
        self.require_rare
    }

    /// Required slot range, if any.
    #[must_use]
    pub const fn slot_range(&self) -> Option<SlotRange> {
        self.slot_range
    }

    /// Whether the alpha band is required.
    #[must_use]
    pub const fn require_alpha(&self) -> bool {
        self.require_alpha
    }

    /// Rejects malformed or unsatisfiable slot ranges before any search begins.
    pub fn validate(&self) -> Result<(), SearchError> {
        let Some(range) = self.slot_range else {
            return Ok(());
        };

        let well_formed = range.min >= 0.0 && range.min <= range.max && range.max <= range.total;
        if !well_formed {
            return Err(SearchError::MalformedSlotRange {
                min: range.min,
                max: range.max,
                total: range.total,
            });
        }

        if range.is_empty() {
            return Err(SearchError::ImpossibleFilter);
        }

        Ok(())
    }

    /// Runs [`FilterCriteria::validate`] and additionally requires the slot
    /// range to be measured out of `spawner_total`.
    pub fn validate_for(&self, spawner_total: f64) -> Result<(), SearchError> {
        self.validate()?;
        match self.slot_range {
            Some(range) if range.total != spawner_total => Err(SearchError::SlotTotalMismatch {
                range_total: range.total,
                spawner_total,
            }),
            _ => Ok(()),
        }
    }

    /// Tests every configured requirement against the encounter.
    #[must_use]
    pub fn accepts(&self, encounter: &Encounter) -> bool {
        if self.require_rare && !encounter.record().is_rare() {
            return false;
        }

        if let Some(range) = self.slot_range {
            if !range.contains(encounter.slot()) {
                return false;
            }
        }

        !self.require_alpha || encounter.is_alpha()
    }
}

/// Total size of a spawn group, including the initial spawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Population(u32);

impl Population {
    /// Validates that the population covers at least the initial spawn.
    pub fn new(total: u32) -> Result<Self, SearchError> {
        if total < INITIAL_POPULATION {
            return Err(SearchError::InvalidPopulation { population: total });
        }
        Ok(Self(total))
    }

    /// Total number of individuals in the group.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Individuals that spawn after the initial batch; every path sums to this.
    #[must_use]
    pub const fn respawns(&self) -> u32 {
        self.0 - INITIAL_POPULATION
    }
}

/// Ordered action counts describing how a spawn group is worked through.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Path(Vec<u32>);

impl Path {
    /// Wraps the provided steps.
    #[must_use]
    pub const fn new(steps: Vec<u32>) -> Self {
        Self(steps)
    }

    /// Steps in order.
    #[must_use]
    pub fn steps(&self) -> &[u32] {
        &self.0
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the path has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of every step.
    #[must_use]
    pub fn sum(&self) -> u32 {
        self.0.iter().sum()
    }

    /// Rejects paths that do not account for every respawn of `population`.
    pub fn expect_sum(&self, population: Population) -> Result<(), SearchError> {
        let actual = self.sum();
        let expected = population.respawns();
        if actual != expected {
            return Err(SearchError::InvalidPath {
                path: self.clone(),
                violation: PathViolation::WrongSum { actual, expected },
            });
        }
        Ok(())
    }
}

impl From<Vec<u32>> for Path {
    fn from(steps: Vec<u32>) -> Self {
        Self(steps)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, step) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str("|")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

/// Reason a supplied path was rejected.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathViolation {
    /// The steps do not add up to the respawn count.
    #[error("steps sum to {actual}, expected {expected}")]
    WrongSum {
        /// Sum of the supplied steps.
        actual: u32,
        /// Respawns the population requires.
        expected: u32,
    },
    /// A step lies outside the range the search strategy allows.
    #[error("step {index} is {step}, outside {min}..={max}")]
    StepOutOfRange {
        /// Position of the offending step.
        index: usize,
        /// Offending value.
        step: u32,
        /// Smallest allowed value.
        min: u32,
        /// Largest allowed value.
        max: u32,
    },
    /// A step follows the final batch, which always ends the path.
    #[error("step {index} follows the final batch")]
    TrailingStep {
        /// Position of the first step after the final batch.
        index: usize,
    },
}

/// Recoverable conditions that stop a search before or instead of running it.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SearchError {
    /// The filter's acceptance range is empty, so nothing can ever match.
    #[error("filter can never match: its slot acceptance range is empty")]
    ImpossibleFilter,
    /// The filter's slot range violates `0 <= min <= max <= total`.
    #[error("slot range [{min}, {max}) out of {total} is malformed")]
    MalformedSlotRange {
        /// Supplied lower bound.
        min: f64,
        /// Supplied upper bound.
        max: f64,
        /// Supplied total.
        total: f64,
    },
    /// The filter's slot range was measured against a different weight total
    /// than the spawner draws slots from.
    #[error("slot range is out of {range_total} but the spawner draws out of {spawner_total}")]
    SlotTotalMismatch {
        /// Total the range was built against.
        range_total: f64,
        /// Total the spawner draws slots from.
        spawner_total: f64,
    },
    /// A supplied path cannot be simulated.
    #[error("path [{path}] is invalid: {violation}")]
    InvalidPath {
        /// Rejected path.
        path: Path,
        /// Rule the path breaks.
        violation: PathViolation,
    },
    /// The population is smaller than the initial spawn.
    #[error("population {population} is smaller than the initial spawn of 4")]
    InvalidPopulation {
        /// Rejected population.
        population: u32,
    },
}

/// Result of a bounded search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SearchOutcome<T> {
    /// A match was found within the bound.
    Found(T),
    /// The bound was reached first; retrying with a larger ceiling may succeed.
    Exhausted {
        /// Ceiling that was reached.
        ceiling: u32,
    },
}

impl<T> SearchOutcome<T> {
    /// Borrows the match, if any.
    #[must_use]
    pub const fn found(&self) -> Option<&T> {
        match self {
            Self::Found(value) => Some(value),
            Self::Exhausted { .. } => None,
        }
    }

    /// Consumes the outcome, returning the match if any.
    #[must_use]
    pub fn into_found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::Exhausted { .. } => None,
        }
    }

    /// Whether the bound was reached without a match.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}

/// First matching advance reported by the linear search.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearMatch {
    advance: u32,
    encounter: Encounter,
}

impl LinearMatch {
    /// Creates a match record.
    #[must_use]
    pub const fn new(advance: u32, encounter: Encounter) -> Self {
        Self { advance, encounter }
    }

    /// Number of hierarchy reseeds before the match.
    #[must_use]
    pub const fn advance(&self) -> u32 {
        self.advance
    }

    /// Matching encounter.
    #[must_use]
    pub const fn encounter(&self) -> &Encounter {
        &self.encounter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encounter_with(slot: f64, personality_value: u32) -> Encounter {
        let record = EncounterRecord::new(0, 0, personality_value, [0; 6], 0, 1, 0);
        Encounter::new(0, 0, slot, record)
    }

    #[test]
    fn rarity_grades_follow_xor() {
        assert_eq!(Rarity::from_ids(0x0001_0001, 0), Rarity::Square);
        assert_eq!(Rarity::from_ids(0x0000_000F, 0), Rarity::Star);
        assert_eq!(Rarity::from_ids(0x0000_0010, 0), Rarity::Common);
        assert!(Rarity::Star.is_rare());
        assert!(!Rarity::Common.is_rare());
    }

    #[test]
    fn record_rarity_matches_flag() {
        let rare = EncounterRecord::new(1, 0xABCD_1234, 0xABCD_1234, [31; 6], 1, 252, 24);
        assert!(rare.is_rare());
        assert_eq!(rare.rarity(), Rarity::Square);

        let common = EncounterRecord::new(1, 0, 0x0100_0000, [0; 6], 0, 1, 0);
        assert!(!common.is_rare());
        assert_eq!(common.rarity(), Rarity::Common);
    }

    #[test]
    fn default_filter_accepts_everything() {
        let filter = FilterCriteria::default();
        assert_eq!(filter, FilterCriteria::new());
        assert!(filter.validate().is_ok());
        assert!(filter.accepts(&encounter_with(42.0, 0x0100_0000)));
    }

    #[test]
    fn filter_requirements_are_independent() {
        let filter = FilterCriteria::new()
            .with_rare(true)
            .with_slot_range(SlotRange::new(100.0, 101.0, 101.0))
            .with_alpha(true);

        assert!(filter.accepts(&encounter_with(100.5, 0)));
        assert!(!filter.accepts(&encounter_with(99.5, 0)));
        assert!(!filter.accepts(&encounter_with(100.5, 0x0100_0000)));
    }

    #[test]
    fn validation_distinguishes_malformed_from_impossible() {
        let malformed = FilterCriteria::new().with_slot_range(SlotRange::new(5.0, 3.0, 10.0));
        assert!(matches!(
            malformed.validate(),
            Err(SearchError::MalformedSlotRange { .. })
        ));

        let zero_width = FilterCriteria::new().with_slot_range(SlotRange::new(3.0, 3.0, 10.0));
        assert_eq!(zero_width.validate(), Err(SearchError::ImpossibleFilter));

        let empty = FilterCriteria::new().with_slot_range(SlotRange::empty());
        assert_eq!(empty.validate(), Err(SearchError::ImpossibleFilter));
    }

    #[test]
    fn spawner_total_must_match_the_range_total() {
        let hundred = FilterCriteria::new().with_slot_range(SlotRange::new(0.0, 5.0, 100.0));
        assert_eq!(
            hundred.validate_for(OUTBREAK_SLOT_TOTAL),
            Err(SearchError::SlotTotalMismatch {
                range_total: 100.0,
                spawner_total: OUTBREAK_SLOT_TOTAL,
            })
        );
        assert_eq!(hundred.validate_for(100.0), Ok(()));
        assert_eq!(FilterCriteria::new().with_rare(true).validate_for(101.0), Ok(()));

        let malformed = FilterCriteria::new().with_slot_range(SlotRange::new(5.0, 3.0, 100.0));
        assert!(matches!(
            malformed.validate_for(OUTBREAK_SLOT_TOTAL),
            Err(SearchError::MalformedSlotRange { .. })
        ));
    }

    #[test]
    fn path_displays_with_separators() {
        assert_eq!(Path::new(vec![1, 3, 2]).to_string(), "1|3|2");
        assert_eq!(Path::default().to_string(), "");
    }

    #[test]
    fn path_sum_is_checked_against_population() {
        let population = Population::new(10).expect("population");
        assert!(Path::new(vec![2, 4]).expect_sum(population).is_ok());

        let error = Path::new(vec![2, 2])
            .expect_sum(population)
            .expect_err("short path");
        assert_eq!(
            error,
            SearchError::InvalidPath {
                path: Path::new(vec![2, 2]),
                violation: PathViolation::WrongSum {
                    actual: 4,
                    expected: 6
                },
            }
        );
    }

    #[test]
    fn population_must_cover_initial_spawn() {
        assert_eq!(
            Population::new(3),
            Err(SearchError::InvalidPopulation { population: 3 })
        );
        assert_eq!(Population::new(4).map(|p| p.respawns()), Ok(0));
    }
}
