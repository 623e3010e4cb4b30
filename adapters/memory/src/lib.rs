#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Memory-access boundary: the channel contract the searches are fed
//! through, the pointer layout of the spawner table and battle slots, and a
//! channel backed by a captured snapshot.

mod battle;
mod pointer;
mod snapshot;

use encounter_oracle_hierarchy::derive_group_seed;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub use battle::{BattleRecord, RecordError, HIDDEN_ABILITY_SLOT, STORED_RECORD_SIZE};
pub use pointer::{PointerParseError, PointerPath};
pub use snapshot::{SnapshotChannel, SnapshotChannelError};

const SPAWNER_TABLE_OFFSETS: [u64; 2] = [0x4268EE0, 0x330];
const PLAYER_LOCATION_OFFSETS: [u64; 7] = [0x42B3558, 0x88, 0x90, 0x1F0, 0x18, 0x80, 0x90];
const GROUP_BASE: u64 = 0x70;
const GROUP_STRIDE: u64 = 0x440;
const GENERATOR_SEED_FIELD: u64 = 0x20;
const OUTBREAK_SEED_FIELD: u64 = 0x408;
const OUTBREAK_SCAN_WINDOW: u32 = 30;
const OUTBREAK_MARKER_LEAD: u32 = 15;

const SPAWNER_TABLE_SIZE_FIELD: u64 = 0x18;
const ACTIVE_SPAWN_BASE: u64 = 0x70;
const ACTIVE_SPAWN_SEED_FIELD: u64 = 0x20;
const ACTIVE_SPAWN_STRIDE: u64 = 0x40;
const SCAN_PROGRESS_STEPS: u32 = 100;

const PARTY_COUNT_OFFSETS: [u64; 4] = [0x4269000, 0xD0, 0x58, 0x88];
const BATTLE_TABLE_OFFSETS: [u64; 4] = [0x4268F00, 0xB0, 0xE0, 0xD0];
const BATTLER_TOTAL_FIELD: u64 = 0x1A0;
const BATTLE_SLOT_BASE: u64 = 0xB0;
const BATTLE_SLOT_STRIDE: u64 = 8;
const BATTLE_RECORD_CHAIN: [u64; 5] = [0x70, 0x60, 0x98, 0x10, 0x0];
const MAX_WILD_BATTLERS: u8 = 30;

const POSITION_SIZE: usize = 12;

/// Synchronous access to the live simulation's memory.
///
/// Failures are reported unchanged; callers never retry.
pub trait MemoryChannel {
    /// Error raised by the transport.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Reads exactly `len` bytes starting at `path`.
    fn read_bytes(&mut self, path: &PointerPath, len: usize) -> Result<Vec<u8>, Self::Error>;

    /// Writes `bytes` starting at `path`.
    fn write_bytes(&mut self, path: &PointerPath, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Reads the little-endian 64-bit value at `path`.
    fn read_u64(&mut self, path: &PointerPath) -> Result<u64, Self::Error> {
        read_array(self, path).map(u64::from_le_bytes)
    }
}

fn read_array<C, const N: usize>(
    channel: &mut C,
    path: &PointerPath,
) -> Result<[u8; N], C::Error>
where
    C: MemoryChannel + ?Sized,
{
    let bytes = channel.read_bytes(path, N)?;
    let mut array = [0; N];
    for (slot, byte) in array.iter_mut().zip(bytes) {
        *slot = byte;
    }
    Ok(array)
}

/// Address of spawner group `group_id`'s generator seed.
#[must_use]
pub fn generator_seed_path(group_id: u32) -> PointerPath {
    group_field(group_id, GENERATOR_SEED_FIELD)
}

/// Address of spawner group `group_id`'s outbreak seed.
#[must_use]
pub fn outbreak_seed_path(group_id: u32) -> PointerPath {
    group_field(group_id, OUTBREAK_SEED_FIELD)
}

/// Address of the player's position.
#[must_use]
pub fn player_location_path() -> PointerPath {
    PointerPath::new(PLAYER_LOCATION_OFFSETS.to_vec())
}

/// Address of the number of individuals in the player's party.
#[must_use]
pub fn party_count_path() -> PointerPath {
    PointerPath::new(PARTY_COUNT_OFFSETS.to_vec())
}

/// Address of the number of individuals in the current battle, party
/// included.
#[must_use]
pub fn battler_total_path() -> PointerPath {
    PointerPath::new(BATTLE_TABLE_OFFSETS.to_vec()).then(BATTLER_TOTAL_FIELD)
}

/// Address of the stored record held by battle slot `slot`. The party fills
/// the first slots.
#[must_use]
pub fn battle_record_path(slot: u32) -> PointerPath {
    let table = PointerPath::new(BATTLE_TABLE_OFFSETS.to_vec())
        .then(BATTLE_SLOT_BASE + u64::from(slot) * BATTLE_SLOT_STRIDE);
    BATTLE_RECORD_CHAIN
        .iter()
        .fold(table, |path, &offset| path.then(offset))
}

fn spawner_table_field(offset: u64) -> PointerPath {
    PointerPath::new(SPAWNER_TABLE_OFFSETS.to_vec()).then(offset)
}

fn group_field(group_id: u32, field: u64) -> PointerPath {
    spawner_table_field(GROUP_BASE + u64::from(group_id) * GROUP_STRIDE + field)
}

/// Seed values read for one spawner group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSeedReading {
    group_id: u32,
    generator_seed: u64,
    group_seed: u64,
}

impl GroupSeedReading {
    /// Spawner group the reading came from.
    #[must_use]
    pub const fn group_id(&self) -> u32 {
        self.group_id
    }

    /// Raw generator value stored by the simulation.
    #[must_use]
    pub const fn generator_seed(&self) -> u64 {
        self.generator_seed
    }

    /// Group seed derived from the raw value.
    #[must_use]
    pub const fn group_seed(&self) -> u64 {
        self.group_seed
    }
}

/// Reads spawner group `group_id`'s generator seed and derives its group seed.
pub fn read_group_seed<C: MemoryChannel>(
    channel: &mut C,
    group_id: u32,
) -> Result<GroupSeedReading, C::Error> {
    let generator_seed = channel.read_u64(&generator_seed_path(group_id))?;
    let reading = GroupSeedReading {
        group_id,
        generator_seed,
        group_seed: derive_group_seed(generator_seed),
    };
    debug!(group_id, generator_seed, group_seed = reading.group_seed, "read group seed");
    Ok(reading)
}

/// Locates the group hosting the active mass outbreak.
///
/// Outbreak groups are allocated just past a location's marker ids, so the
/// window of ids below `last_marker_id + 15` is scanned from the top for the
/// first non-zero outbreak seed.
pub fn find_outbreak_group<C: MemoryChannel>(
    channel: &mut C,
    last_marker_id: u32,
) -> Result<Option<u32>, C::Error> {
    let minimum = last_marker_id.saturating_sub(OUTBREAK_MARKER_LEAD);
    for group_id in (minimum..minimum + OUTBREAK_SCAN_WINDOW).rev() {
        let seed = channel.read_u64(&outbreak_seed_path(group_id))?;
        if seed != 0 {
            info!(group_id, "found mass outbreak");
            return Ok(Some(group_id));
        }
    }
    info!(minimum, "no mass outbreak found");
    Ok(None)
}

/// Encodes a position as three little-endian `f32` values.
#[must_use]
pub fn encode_position(position: [f32; 3]) -> [u8; 12] {
    let mut bytes = [0; 12];
    for (chunk, coordinate) in bytes.chunks_exact_mut(4).zip(position) {
        chunk.copy_from_slice(&coordinate.to_le_bytes());
    }
    bytes
}

/// Decodes three little-endian `f32` values; missing bytes read as zero.
#[must_use]
pub fn decode_position(bytes: &[u8]) -> [f32; 3] {
    let mut position = [0.0; 3];
    for (coordinate, chunk) in position.iter_mut().zip(bytes.chunks_exact(4)) {
        *coordinate = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    position
}

/// Reads the player's position.
pub fn read_position<C: MemoryChannel>(channel: &mut C) -> Result<[f32; 3], C::Error> {
    let bytes = channel.read_bytes(&player_location_path(), POSITION_SIZE)?;
    Ok(decode_position(&bytes))
}

/// Moves the player to `position`.
pub fn write_position<C: MemoryChannel>(
    channel: &mut C,
    position: [f32; 3],
) -> Result<(), C::Error> {
    info!(x = position[0], y = position[1], z = position[2], "teleporting");
    channel.write_bytes(&player_location_path(), &encode_position(position))
}

/// Spawner whose slot in the table currently holds an individual.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActiveSpawn {
    spawner_id: u32,
    position: [f32; 3],
    seed: u64,
}

impl ActiveSpawn {
    /// Index of the spawner in the table.
    #[must_use]
    pub const fn spawner_id(&self) -> u32 {
        self.spawner_id
    }

    /// Where the individual stands.
    #[must_use]
    pub const fn position(&self) -> [f32; 3] {
        self.position
    }

    /// Seed held by the spawner slot.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }
}

/// Walks the spawner table and lists every slot holding an individual.
///
/// Slots with a zero seed or any coordinate below one are empty.
pub fn scan_active_spawners<C: MemoryChannel>(
    channel: &mut C,
) -> Result<Vec<ActiveSpawn>, C::Error> {
    let size_path = spawner_table_field(SPAWNER_TABLE_SIZE_FIELD);
    let size = u32::from_le_bytes(read_array(channel, &size_path)?);
    let count = (size / ACTIVE_SPAWN_STRIDE as u32).saturating_sub(1);
    info!(count, "scanning spawner table");

    let progress_every = (count / SCAN_PROGRESS_STEPS).max(1);
    let mut active = Vec::new();
    for spawner_id in 0..count {
        if spawner_id % progress_every == 0 {
            debug!(spawner_id, count, "spawner scan progress");
        }
        let base = ACTIVE_SPAWN_BASE + u64::from(spawner_id) * ACTIVE_SPAWN_STRIDE;
        let position_bytes = channel.read_bytes(&spawner_table_field(base), POSITION_SIZE)?;
        let position = decode_position(&position_bytes);
        let seed = channel.read_u64(&spawner_table_field(base + ACTIVE_SPAWN_SEED_FIELD))?;
        if seed == 0 || position.iter().any(|&coordinate| coordinate < 1.0) {
            continue;
        }
        debug!(spawner_id, seed, "active spawner");
        active.push(ActiveSpawn {
            spawner_id,
            position,
            seed,
        });
    }
    Ok(active)
}

/// Wild individual found in a battle slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WildBattler {
    index: u8,
    record: BattleRecord,
}

impl WildBattler {
    /// Zero-based position among the wild battlers.
    #[must_use]
    pub const fn index(&self) -> u8 {
        self.index
    }

    /// Decoded record.
    #[must_use]
    pub const fn record(&self) -> &BattleRecord {
        &self.record
    }
}

/// Reads the wild individuals of the current battle.
///
/// The party occupies the first battle slots; the wild ones follow. Records
/// that do not decode to a valid individual are left out. A wild count above
/// thirty means no battle is running.
pub fn read_battle<C: MemoryChannel>(channel: &mut C) -> Result<Vec<WildBattler>, C::Error> {
    let [party] = read_array::<_, 1>(channel, &party_count_path())?;
    let [total] = read_array::<_, 1>(channel, &battler_total_path())?;
    let mut wild = total.saturating_sub(party);
    if wild > MAX_WILD_BATTLERS {
        debug!(wild, "battler count out of range; no battle");
        wild = 0;
    }

    let mut battlers = Vec::new();
    for index in 0..wild {
        let path = battle_record_path(u32::from(index) + u32::from(party));
        let bytes = channel.read_bytes(&path, STORED_RECORD_SIZE)?;
        match BattleRecord::decode(&bytes) {
            Ok(record) if record.is_valid() => battlers.push(WildBattler { index, record }),
            Ok(_) => debug!(index, "battle slot holds no valid record"),
            Err(error) => debug!(index, %error, "battle slot unreadable"),
        }
    }
    info!(party, wild, valid = battlers.len(), "read battle");
    Ok(battlers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_fields_follow_the_stride() {
        assert_eq!(generator_seed_path(0).to_string(), "[[main+4268EE0]+330]+90");
        assert_eq!(generator_seed_path(2).to_string(), "[[main+4268EE0]+330]+910");
        assert_eq!(outbreak_seed_path(1).to_string(), "[[main+4268EE0]+330]+8B8");
    }

    #[test]
    fn player_location_matches_layout() {
        assert_eq!(
            player_location_path().to_string(),
            "[[[[[[main+42B3558]+88]+90]+1F0]+18]+80]+90"
        );
    }

    #[test]
    fn battle_slots_chain_through_the_record_pointers() {
        assert_eq!(party_count_path().to_string(), "[[[main+4269000]+D0]+58]+88");
        assert_eq!(battler_total_path().to_string(), "[[[[main+4268F00]+B0]+E0]+D0]+1A0");
        assert_eq!(
            battle_record_path(2).to_string(),
            "[[[[[[[[[main+4268F00]+B0]+E0]+D0]+C0]+70]+60]+98]+10]+0"
        );
    }

    #[test]
    fn positions_decode_what_they_encode() {
        let position = [365.36, 52.0, -136.1];
        assert_eq!(decode_position(&encode_position(position)), position);
        assert_eq!(decode_position(&[0, 0, 0x80, 0x3F]), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn positions_encode_little_endian() {
        let bytes = encode_position([1.0, -2.0, 0.5]);
        assert_eq!(&bytes[..4], &[0x00, 0x00, 0x80, 0x3F]);
        assert_eq!(&bytes[4..8], &[0x00, 0x00, 0x00, 0xC0]);
        assert_eq!(&bytes[8..], &[0x00, 0x00, 0x00, 0x3F]);
    }
}
