#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Static reference data consumed by the presentation boundary: name tables
//! indexed by small integers, per-location encounter slot tables and spawner
//! marker tables.

mod markers;
mod names;
mod ordered;
mod slots;

use std::{io, path::PathBuf};

use thiserror::Error;

pub use markers::{Marker, MarkerTable};
pub use names::NameTable;
pub use slots::{
    possible_spawners, spawn_share_percent, LocationSlots, SlotWeights, SpawnerSlots, ALL_WEATHER,
    ANY_TIME,
};

/// Failures raised while loading or querying reference data.
#[derive(Debug, Error)]
pub enum ReferenceDataError {
    /// The file could not be read.
    #[error("failed to read {}", path.display())]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The document is not valid JSON of the expected shape.
    #[error("failed to parse {what}")]
    Json {
        /// Kind of document being parsed.
        what: &'static str,
        /// Underlying parse failure.
        #[source]
        source: serde_json::Error,
    },
    /// A slot condition key lacks the `<time>/<weather>` separator.
    #[error("condition key `{key}` is not of the form <time>/<weather>")]
    MalformedConditionKey {
        /// Offending key.
        key: String,
    },
    /// A candidate weight is negative or not finite.
    #[error("weight {weight} of `{candidate}` is not a finite non-negative number")]
    InvalidWeight {
        /// Candidate carrying the weight.
        candidate: String,
        /// Offending weight.
        weight: f64,
    },
    /// A marker key is not an integer group id.
    #[error("marker id `{id}` is not an integer")]
    InvalidMarkerId {
        /// Offending key.
        id: String,
    },
    /// A marker names a spawner with no slot table.
    #[error("no slot table for spawner `{name}`")]
    UnknownSpawner {
        /// Spawner name carried by the marker.
        name: String,
    },
}

fn read_file(path: &std::path::Path) -> Result<String, ReferenceDataError> {
    std::fs::read_to_string(path).map_err(|source| ReferenceDataError::Io {
        path: path.to_path_buf(),
        source,
    })
}
