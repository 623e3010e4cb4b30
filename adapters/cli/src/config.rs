use std::{fs, path::Path};

use anyhow::{Context, Result};
use encounter_oracle_core::DEFAULT_ADVANCE_CEILING;
use encounter_oracle_system_encounter::OutbreakProfile;
use serde::Deserialize;

/// Defaults applied when a command-line flag is omitted.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Settings {
    pub(crate) advance_ceiling: u32,
    pub(crate) rolls: u32,
    pub(crate) population: u32,
    pub(crate) passive_move_limit: usize,
    pub(crate) alpha_guaranteed_high_stats: u32,
    pub(crate) slot_total: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            advance_ceiling: DEFAULT_ADVANCE_CEILING,
            rolls: 1,
            population: 10,
            passive_move_limit: 3,
            alpha_guaranteed_high_stats: OutbreakProfile::DEFAULT_ALPHA_GUARANTEE,
            slot_total: 100.0,
        }
    }
}

impl Settings {
    /// Loads settings from `path`, falling back to the defaults when absent.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("invalid settings in {}", path.display()))
    }

    fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("failed to parse settings toml contents")
    }
}
