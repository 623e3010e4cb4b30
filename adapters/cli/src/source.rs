use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use encounter_oracle_hierarchy::derive_group_seed;
use encounter_oracle_memory::{find_outbreak_group, read_group_seed, SnapshotChannel};
use encounter_oracle_reference_data::MarkerTable;
use tracing::info;

/// Parses a seed written as `0x`-prefixed hexadecimal or as decimal.
pub(crate) fn parse_seed(text: &str) -> Result<u64, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(digits) => u64::from_str_radix(&digits.replace('_', ""), 16),
        None => text.replace('_', "").parse(),
    };
    parsed.map_err(|error| format!("`{text}` is not a 64-bit seed: {error}"))
}

/// Where the group seed of the searched spawner comes from.
#[derive(Args, Debug)]
pub(crate) struct SourceArgs {
    /// Raw generator value stored by the spawner.
    #[arg(long, value_parser = parse_seed, conflicts_with_all = ["group_seed", "dump"])]
    raw_seed: Option<u64>,
    /// Group seed already derived from the raw value.
    #[arg(long, value_parser = parse_seed, conflicts_with = "dump")]
    group_seed: Option<u64>,
    /// Captured memory snapshot holding the spawner table.
    #[arg(long)]
    dump: Option<PathBuf>,
    /// Spawner group to read from the snapshot.
    #[arg(long, requires = "dump")]
    group_id: Option<u32>,
    /// Marker table used to locate the mass outbreak when no group id is given.
    #[arg(long, requires = "dump", conflicts_with = "group_id")]
    markers: Option<PathBuf>,
}

impl SourceArgs {
    /// Resolves the group seed the search starts from.
    pub(crate) fn group_seed(&self) -> Result<u64> {
        if let Some(raw_seed) = self.raw_seed {
            return Ok(derive_group_seed(raw_seed));
        }
        if let Some(group_seed) = self.group_seed {
            return Ok(group_seed);
        }
        let Some(dump) = &self.dump else {
            bail!("one of --raw-seed, --group-seed or --dump is required");
        };

        let mut channel = SnapshotChannel::load(dump)?;
        let group_id = match (self.group_id, &self.markers) {
            (Some(group_id), _) => group_id,
            (None, Some(markers)) => {
                let markers = MarkerTable::load(markers)?;
                let last_marker_id = markers
                    .last_id()
                    .context("marker table lists no spawners")?;
                find_outbreak_group(&mut channel, last_marker_id)?
                    .context("No mass outbreak found")?
            }
            (None, None) => bail!("--dump needs --group-id or --markers"),
        };

        let reading = read_group_seed(&mut channel, group_id)?;
        info!(
            group_id,
            generator_seed = reading.generator_seed(),
            "read spawner from snapshot"
        );
        Ok(reading.group_seed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_parse_as_hex_or_decimal() {
        assert_eq!(parse_seed("0x1000_0000_0000_0000"), Ok(0x1000_0000_0000_0000));
        assert_eq!(parse_seed("0XFF"), Ok(0xFF));
        assert_eq!(parse_seed("4660"), Ok(0x1234));
        assert!(parse_seed("0xZZ").is_err());
        assert!(parse_seed("-1").is_err());
    }
}
