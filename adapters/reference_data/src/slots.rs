//! Per-location encounter slot tables.
//!
//! A location document maps spawner names to condition keys of the form
//! `<time>/<weather>`, each holding candidate weights in slot order. Slot
//! values drawn by a spawner are resolved against the first matching
//! condition.

use std::path::Path;

use encounter_oracle_core::SlotRange;
use tracing::debug;

use crate::{markers::MarkerTable, ordered::Ordered, read_file, ReferenceDataError};

/// Time component matching every time of day.
pub const ANY_TIME: &str = "Any Time";

/// Weather component matching every weather.
pub const ALL_WEATHER: &str = "All Weather";

/// Candidate weights of one condition, in slot order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SlotWeights {
    entries: Vec<(String, f64)>,
}

impl SlotWeights {
    /// Validates that every weight is finite and non-negative.
    pub fn new(entries: Vec<(String, f64)>) -> Result<Self, ReferenceDataError> {
        if let Some((candidate, weight)) = entries
            .iter()
            .find(|(_, weight)| !weight.is_finite() || *weight < 0.0)
        {
            return Err(ReferenceDataError::InvalidWeight {
                candidate: candidate.clone(),
                weight: *weight,
            });
        }
        Ok(Self { entries })
    }

    /// Candidates and weights in slot order.
    #[must_use]
    pub fn entries(&self) -> &[(String, f64)] {
        &self.entries
    }

    /// Sum of every weight.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, weight)| weight).sum()
    }

    /// Slot interval owned by `candidate`; empty when the candidate is absent.
    #[must_use]
    pub fn slot_range(&self, candidate: &str) -> SlotRange {
        let mut start = 0.0;
        let mut found = None;
        for (name, weight) in &self.entries {
            if found.is_none() && name == candidate {
                found = Some((start, start + weight));
            }
            start += weight;
        }

        match found {
            Some((min, max)) => SlotRange::new(min, max, start),
            None => SlotRange::empty(),
        }
    }

    /// Candidate selected by `slot`: the first whose weight covers the
    /// residual slot after subtracting every earlier weight.
    #[must_use]
    pub fn slot_to_candidate(&self, slot: f64) -> Option<&str> {
        let mut residual = slot;
        for (name, weight) in &self.entries {
            if residual <= *weight {
                return Some(name);
            }
            residual -= weight;
        }
        None
    }
}

/// Condition keyed slot tables of one spawner.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpawnerSlots {
    conditions: Vec<(String, String, SlotWeights)>,
}

impl SpawnerSlots {
    fn from_ordered(conditions: Ordered<Ordered<f64>>) -> Result<Self, ReferenceDataError> {
        let conditions = conditions
            .0
            .into_iter()
            .map(|(key, weights)| -> Result<_, ReferenceDataError> {
                let (time, weather) = key
                    .split_once('/')
                    .ok_or_else(|| ReferenceDataError::MalformedConditionKey { key: key.clone() })?;
                Ok((time.to_owned(), weather.to_owned(), SlotWeights::new(weights.0)?))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { conditions })
    }

    /// First table whose condition matches, honouring the wildcards.
    #[must_use]
    pub fn find_slots(&self, time: &str, weather: &str) -> Option<&SlotWeights> {
        self.conditions
            .iter()
            .find(|(slot_time, slot_weather, _)| {
                (slot_time == ANY_TIME || slot_time == time)
                    && (slot_weather == ALL_WEATHER || slot_weather == weather)
            })
            .map(|(_, _, weights)| weights)
    }

    /// Slot interval of `candidate` under the given conditions; empty when no
    /// table matches or the candidate is absent.
    #[must_use]
    pub fn find_slot_range(&self, time: &str, weather: &str, candidate: &str) -> SlotRange {
        self.find_slots(time, weather)
            .map_or_else(SlotRange::empty, |weights| weights.slot_range(candidate))
    }

    /// Candidate selected by `slot` under the given conditions.
    #[must_use]
    pub fn slot_to_candidate(&self, time: &str, weather: &str, slot: f64) -> Option<&str> {
        self.find_slots(time, weather)
            .and_then(|weights| weights.slot_to_candidate(slot))
    }
}

/// Slot tables of every spawner at one location.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LocationSlots {
    spawners: Vec<(String, SpawnerSlots)>,
}

impl LocationSlots {
    /// Parses a location document.
    pub fn from_json_str(json: &str) -> Result<Self, ReferenceDataError> {
        let document: Ordered<Ordered<Ordered<f64>>> =
            serde_json::from_str(json).map_err(|source| ReferenceDataError::Json {
                what: "slot table",
                source,
            })?;

        let spawners = document
            .0
            .into_iter()
            .map(|(name, conditions)| {
                SpawnerSlots::from_ordered(conditions).map(|slots| (name, slots))
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!(spawners = spawners.len(), "loaded slot table");
        Ok(Self { spawners })
    }

    /// Reads and parses a location document from disk.
    pub fn load(path: &Path) -> Result<Self, ReferenceDataError> {
        Self::from_json_str(&read_file(path)?)
    }

    /// Tables of the named spawner.
    #[must_use]
    pub fn spawner(&self, name: &str) -> Option<&SpawnerSlots> {
        self.spawners
            .iter()
            .find(|(spawner, _)| spawner == name)
            .map(|(_, slots)| slots)
    }

    /// Spawner names in document order.
    pub fn spawner_names(&self) -> impl Iterator<Item = &str> {
        self.spawners.iter().map(|(name, _)| name.as_str())
    }
}

/// Share of the slot space `range` covers, in percent; `None` when the
/// range has no weight at all.
#[must_use]
pub fn spawn_share_percent(range: SlotRange) -> Option<f64> {
    if range.total() == 0.0 {
        return None;
    }
    Some(range.share_percent())
}

/// Every marker whose spawner can produce `candidate` under the given
/// conditions, with the candidate's share of that spawner's slots.
pub fn possible_spawners(
    markers: &MarkerTable,
    slots: &LocationSlots,
    time: &str,
    weather: &str,
    candidate: &str,
) -> Result<Vec<(u32, f64)>, ReferenceDataError> {
    let mut possible = Vec::new();
    for (id, marker) in markers.iter() {
        let spawner = slots
            .spawner(marker.name())
            .ok_or_else(|| ReferenceDataError::UnknownSpawner {
                name: marker.name().to_owned(),
            })?;
        let range = spawner.find_slot_range(time, weather, candidate);
        if let Some(share) = spawn_share_percent(range) {
            possible.push((id, share));
        }
    }
    Ok(possible)
}
