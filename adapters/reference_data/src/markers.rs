use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{ordered::Ordered, read_file, ReferenceDataError};

/// Map marker describing one spawner group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    name: String,
    #[serde(default)]
    ivs: u32,
}

impl Marker {
    /// Creates a marker.
    #[must_use]
    pub const fn new(name: String, ivs: u32) -> Self {
        Self { name, ivs }
    }

    /// Spawner name used to look up the slot table.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Maximum stats guaranteed by the spawner.
    #[must_use]
    pub const fn guaranteed_high_stats(&self) -> u32 {
        self.ivs
    }
}

/// Markers of one location keyed by group id, in document order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MarkerTable {
    markers: Vec<(u32, Marker)>,
}

impl MarkerTable {
    /// Parses a marker document keyed by decimal group id.
    pub fn from_json_str(json: &str) -> Result<Self, ReferenceDataError> {
        let document: Ordered<Marker> =
            serde_json::from_str(json).map_err(|source| ReferenceDataError::Json {
                what: "marker table",
                source,
            })?;

        let markers = document
            .0
            .into_iter()
            .map(|(id, marker)| match id.parse::<u32>() {
                Ok(group_id) => Ok((group_id, marker)),
                Err(_) => Err(ReferenceDataError::InvalidMarkerId { id }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { markers })
    }

    /// Reads and parses a marker document from disk.
    pub fn load(path: &Path) -> Result<Self, ReferenceDataError> {
        Self::from_json_str(&read_file(path)?)
    }

    /// Marker of `group_id`.
    #[must_use]
    pub fn get(&self, group_id: u32) -> Option<&Marker> {
        self.markers
            .iter()
            .find(|(id, _)| *id == group_id)
            .map(|(_, marker)| marker)
    }

    /// Markers in document order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Marker)> {
        self.markers.iter().map(|(id, marker)| (*id, marker))
    }

    /// Id of the last marker in the document.
    #[must_use]
    pub fn last_id(&self) -> Option<u32> {
        self.markers.last().map(|(id, _)| *id)
    }
}
