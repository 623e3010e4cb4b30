use encounter_oracle_core::Rarity;
use encounter_oracle_memory::{
    battle_record_path, battler_total_path, party_count_path, read_battle, SnapshotChannel,
    STORED_RECORD_SIZE,
};

/// Unencrypted stored record with a correct checksum.
fn stored_record(species: u16, personality_value: u32) -> Vec<u8> {
    let mut data = vec![0; STORED_RECORD_SIZE];
    data[..4].copy_from_slice(&0x9B1A_C87Cu32.to_le_bytes());
    data[0x08..0x0A].copy_from_slice(&species.to_le_bytes());
    data[0x0C..0x10].copy_from_slice(&0xD88C_167Du32.to_le_bytes());
    data[0x1C..0x20].copy_from_slice(&personality_value.to_le_bytes());
    data[0x20] = 4;
    data[0x94..0x98].copy_from_slice(&(31u32 | 30 << 5 | 29 << 15).to_le_bytes());

    let checksum = data[8..]
        .chunks_exact(2)
        .fold(0u16, |sum, word| sum.wrapping_add(u16::from_le_bytes([word[0], word[1]])));
    data[0x06..0x08].copy_from_slice(&checksum.to_le_bytes());
    data
}

fn battle(party: u64, total: u64) -> SnapshotChannel {
    SnapshotChannel::new()
        .with_value(party_count_path(), party)
        .with_value(battler_total_path(), total)
}

#[test]
fn wild_battlers_follow_the_party() {
    let mut corrupt = stored_record(400, 1);
    corrupt[0x08] ^= 0xFF;
    let mut channel = battle(2, 5)
        .with_bytes(battle_record_path(2), stored_record(399, 0xF146_3FBF))
        .with_bytes(battle_record_path(3), corrupt)
        .with_bytes(battle_record_path(4), stored_record(401, 7));

    let battlers = read_battle(&mut channel).expect("battle captured");

    let indices: Vec<u8> = battlers.iter().map(|battler| battler.index()).collect();
    assert_eq!(indices, vec![0, 2]);

    let first = battlers[0].record();
    assert!(first.is_valid());
    assert_eq!(first.species(), 399);
    assert_eq!(first.identity_constant(), 0x9B1A_C87C);
    assert_eq!(first.personality_trait_index(), 4);
    assert_eq!(first.genetic_stats(), [31, 30, 0, 0, 0, 29]);
    assert_eq!(first.rarity(), Rarity::Star);
    assert_eq!(battlers[1].record().rarity(), Rarity::Common);
}

#[test]
fn out_of_range_battler_counts_mean_no_battle() {
    let mut channel = battle(1, 40);
    assert!(read_battle(&mut channel).expect("counts captured").is_empty());

    let mut channel = battle(3, 1);
    assert!(read_battle(&mut channel).expect("counts captured").is_empty());
}
