//! Stored form of an individual held by a battle slot.
//!
//! A stored record is an eight-byte header followed by four 88-byte blocks.
//! While the simulation holds it the blocks are xored with a linear
//! congruential keystream seeded by the identity constant and then shuffled
//! into one of 24 orders picked by the same constant.

use encounter_oracle_core::{Rarity, GENETIC_STAT_COUNT};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bytes in one stored record.
pub const STORED_RECORD_SIZE: usize = 360;

const HEADER_SIZE: usize = 8;
const BLOCK_SIZE: usize = 88;
const KEYSTREAM_MULTIPLIER: u32 = 0x41C6_4E6D;
const KEYSTREAM_INCREMENT: u32 = 0x6073;

const IDENTITY_CONSTANT: usize = 0x00;
const CHECKSUM: usize = 0x06;
const SPECIES: usize = 0x08;
const OWNER_IDENTITY: usize = 0x0C;
const ABILITY: usize = 0x14;
const ABILITY_SLOT: usize = 0x16;
const PERSONALITY_VALUE: usize = 0x1C;
const PERSONALITY_TRAIT: usize = 0x20;
const SEX: usize = 0x22;
const FORM: usize = 0x24;
const ENCRYPTION_MARKERS: [usize; 2] = [0x70, 0xC0];
const GENETIC_STATS: usize = 0x94;

/// Ability slots from this value on are the hidden one.
pub const HIDDEN_ABILITY_SLOT: u8 = 4;

/// Source block for each destination block, indexed by shuffle order. Orders
/// past 23 repeat the first eight rows.
const BLOCK_ORDER: [[usize; 4]; 32] = [
    [0, 1, 2, 3],
    [0, 1, 3, 2],
    [0, 2, 1, 3],
    [0, 3, 1, 2],
    [0, 2, 3, 1],
    [0, 3, 2, 1],
    [1, 0, 2, 3],
    [1, 0, 3, 2],
    [2, 0, 1, 3],
    [3, 0, 1, 2],
    [2, 0, 3, 1],
    [3, 0, 2, 1],
    [1, 2, 0, 3],
    [1, 3, 0, 2],
    [2, 1, 0, 3],
    [3, 1, 0, 2],
    [2, 3, 0, 1],
    [3, 2, 0, 1],
    [1, 2, 3, 0],
    [1, 3, 2, 0],
    [2, 1, 3, 0],
    [3, 1, 2, 0],
    [2, 3, 1, 0],
    [3, 2, 1, 0],
    [0, 1, 2, 3],
    [0, 1, 3, 2],
    [0, 2, 1, 3],
    [0, 3, 1, 2],
    [0, 2, 3, 1],
    [0, 3, 2, 1],
    [1, 0, 2, 3],
    [1, 0, 3, 2],
];

/// Reasons bytes cannot be decoded as a stored record.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    /// The buffer is not exactly one stored record long.
    #[error("stored record is {actual} bytes, expected {STORED_RECORD_SIZE}")]
    Length {
        /// Bytes supplied.
        actual: usize,
    },
}

/// Individual decoded from a battle slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleRecord {
    identity_constant: u32,
    species: u16,
    form: u16,
    owner_identity: u32,
    personality_value: u32,
    ability: u16,
    ability_slot: u8,
    personality_trait_index: u8,
    sex: u8,
    genetic_stats: [u8; GENETIC_STAT_COUNT],
    valid: bool,
}

impl BattleRecord {
    /// Decrypts `bytes` when they are still encrypted and reads the fields.
    ///
    /// A record whose checksum disagrees with its body, or that still looks
    /// encrypted afterwards, decodes with [`BattleRecord::is_valid`] false.
    pub fn decode(bytes: &[u8]) -> Result<Self, RecordError> {
        let mut data: [u8; STORED_RECORD_SIZE] = bytes
            .try_into()
            .map_err(|_| RecordError::Length {
                actual: bytes.len(),
            })?;
        if is_encrypted(&data) {
            decrypt(&mut data);
        }

        let stats = u32_at(&data, GENETIC_STATS);
        let stat = |shift: u32| ((stats >> shift) & 0x1F) as u8;
        Ok(Self {
            identity_constant: u32_at(&data, IDENTITY_CONSTANT),
            species: u16_at(&data, SPECIES),
            form: u16_at(&data, FORM),
            owner_identity: u32_at(&data, OWNER_IDENTITY),
            personality_value: u32_at(&data, PERSONALITY_VALUE),
            ability: u16_at(&data, ABILITY),
            ability_slot: data[ABILITY_SLOT] & 0x7,
            personality_trait_index: data[PERSONALITY_TRAIT],
            sex: (data[SEX] >> 2) & 0x3,
            // Speed is stored fourth but listed last.
            genetic_stats: [stat(0), stat(5), stat(10), stat(20), stat(25), stat(15)],
            valid: u16_at(&data, CHECKSUM) == checksum(&data) && !is_encrypted(&data),
        })
    }

    /// Identity constant; also the key the record was encrypted with.
    #[must_use]
    pub const fn identity_constant(&self) -> u32 {
        self.identity_constant
    }

    /// Species number.
    #[must_use]
    pub const fn species(&self) -> u16 {
        self.species
    }

    /// Form index; zero is the base form.
    #[must_use]
    pub const fn form(&self) -> u16 {
        self.form
    }

    /// Combined owner identity.
    #[must_use]
    pub const fn owner_identity(&self) -> u32 {
        self.owner_identity
    }

    /// Personality value.
    #[must_use]
    pub const fn personality_value(&self) -> u32 {
        self.personality_value
    }

    /// Ability number.
    #[must_use]
    pub const fn ability(&self) -> u16 {
        self.ability
    }

    /// Species-specific ability slot; [`HIDDEN_ABILITY_SLOT`] and above is
    /// the hidden ability.
    #[must_use]
    pub const fn ability_slot(&self) -> u8 {
        self.ability_slot
    }

    /// Index into the personality trait name table.
    #[must_use]
    pub const fn personality_trait_index(&self) -> u8 {
        self.personality_trait_index
    }

    /// Sex code.
    #[must_use]
    pub const fn sex(&self) -> u8 {
        self.sex
    }

    /// Genetic stats in display order.
    #[must_use]
    pub const fn genetic_stats(&self) -> [u8; GENETIC_STAT_COUNT] {
        self.genetic_stats
    }

    /// Rarity grade of the personality value under the owner identity.
    #[must_use]
    pub const fn rarity(&self) -> Rarity {
        Rarity::from_ids(self.personality_value, self.owner_identity)
    }

    /// Whether the checksum matched and the record was fully decrypted.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.valid
    }
}

fn u16_at(data: &[u8; STORED_RECORD_SIZE], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn u32_at(data: &[u8; STORED_RECORD_SIZE], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

fn is_encrypted(data: &[u8; STORED_RECORD_SIZE]) -> bool {
    ENCRYPTION_MARKERS
        .iter()
        .all(|&offset| u16_at(data, offset) != 0)
}

fn checksum(data: &[u8; STORED_RECORD_SIZE]) -> u16 {
    data[HEADER_SIZE..]
        .chunks_exact(2)
        .fold(0u16, |sum, word| {
            sum.wrapping_add(u16::from_le_bytes([word[0], word[1]]))
        })
}

fn apply_keystream(data: &mut [u8; STORED_RECORD_SIZE]) {
    let mut seed = u32_at(data, IDENTITY_CONSTANT);
    for pair in data[HEADER_SIZE..].chunks_exact_mut(2) {
        seed = seed
            .wrapping_mul(KEYSTREAM_MULTIPLIER)
            .wrapping_add(KEYSTREAM_INCREMENT);
        pair[0] ^= (seed >> 16) as u8;
        pair[1] ^= (seed >> 24) as u8;
    }
}

fn block_order(data: &[u8; STORED_RECORD_SIZE]) -> [usize; 4] {
    BLOCK_ORDER[((u32_at(data, IDENTITY_CONSTANT) >> 13) & 0x1F) as usize]
}

fn block(index: usize) -> std::ops::Range<usize> {
    let start = HEADER_SIZE + index * BLOCK_SIZE;
    start..start + BLOCK_SIZE
}

fn decrypt(data: &mut [u8; STORED_RECORD_SIZE]) {
    apply_keystream(data);
    let stored = *data;
    for (destination, source) in block_order(data).into_iter().enumerate() {
        data[block(destination)].copy_from_slice(&stored[block(source)]);
    }
}
