use encounter_oracle_core::{Rarity, Xoroshiro128Plus, OUTBREAK_SLOT_TOTAL};
use encounter_oracle_system_encounter::{
    generate, slot_value, OutbreakProfile, Spawner, SpawnerProfile,
};

#[test]
fn seed_one_matches_recorded_vector() {
    let record = generate(1, 1, 0);

    assert_eq!(record.identity_constant(), 0x229D_6A5C);
    assert_eq!(record.owner_identity(), 0x9E1D_98FE);
    assert_eq!(record.personality_value(), 0x12B7_AA70);
    assert_eq!(record.genetic_stats(), [13, 22, 29, 23, 20, 31]);
    assert_eq!(record.secondary_trait(), 0);
    assert_eq!(record.sex_value(), 112);
    assert_eq!(record.personality_trait_index(), 1);
    assert!(!record.is_rare());
    assert_eq!(record.rarity(), Rarity::Common);
}

#[test]
fn guaranteed_stats_are_placed_before_the_rest() {
    let record = generate(1, 1, 3);

    assert_eq!(record.personality_value(), 0x12B7_AA70);
    assert_eq!(record.genetic_stats(), [21, 31, 0, 21, 31, 31]);
    assert_eq!(record.sex_value(), 39);
    assert_eq!(record.personality_trait_index(), 3);
}

#[test]
fn six_guaranteed_stats_fill_every_slot() {
    let record = generate(1, 1, 6);

    assert_eq!(record.genetic_stats(), [31; 6]);
    assert_eq!(record.secondary_trait(), 1);
    assert_eq!(record.sex_value(), 88);
    assert_eq!(record.personality_trait_index(), 12);
}

#[test]
fn confirmation_stops_at_first_rare_personality() {
    let short = generate(234, 6, 0);
    let exact = generate(234, 7, 0);
    let generous = generate(234, 64, 0);

    assert!(!short.is_rare());
    assert_eq!(short.personality_value(), 0x1C47_ED39);

    assert!(exact.is_rare());
    assert_eq!(exact.identity_constant(), 0x229D_6B45);
    assert_eq!(exact.owner_identity(), 0xF682_9955);
    assert_eq!(exact.personality_value(), 0xA11D_CEC3);
    assert_eq!(exact.genetic_stats(), [2, 19, 8, 27, 18, 14]);
    assert_eq!(exact.sex_value(), 128);
    assert_eq!(exact.personality_trait_index(), 7);

    assert_eq!(generous, exact, "extra attempts after a rare draw must not be consumed");
}

#[test]
fn generation_is_pure() {
    for seed in [0, 1, 0xdead_beef, u64::MAX] {
        assert_eq!(generate(seed, 4, 2), generate(seed, 4, 2));
    }
}

#[test]
fn spawner_draws_slot_then_encounter_seed() {
    let generator_seed = 0x1234;
    let profile = SpawnerProfile::new(1, 0, 100.0);
    let encounter = profile.spawn(generator_seed);

    let mut rng = Xoroshiro128Plus::new(generator_seed);
    let slot = slot_value(rng.next_u64(), 100.0);
    let seed = rng.next_u64();

    assert_eq!(encounter.generator_seed(), generator_seed);
    assert_eq!(encounter.seed(), seed);
    assert_eq!(encounter.slot(), slot);
    assert_eq!(*encounter.record(), generate(seed, 1, 0));
}

#[test]
fn outbreak_spawner_uses_fixed_slot_total() {
    let profile = OutbreakProfile::new(1);
    assert_eq!(Spawner::slot_total(&profile), OUTBREAK_SLOT_TOTAL);
    let encounter = profile.spawn(0x1234);

    assert_eq!(encounter.seed(), 0x8786_A1EA_C348_A713);
    assert!((encounter.slot() - 51.539_795_113_414_71).abs() < 1e-9);
    assert!(!encounter.is_alpha());
    assert_eq!(encounter.record().genetic_stats(), [0, 27, 8, 25, 4, 14]);
}

#[test]
fn outbreak_alphas_receive_guaranteed_stats() {
    let generator_seed = 0x7C3C_1188_E50E_6B1E;
    let alpha = OutbreakProfile::new(1).spawn(generator_seed);

    assert!(alpha.is_alpha());
    assert_eq!(alpha.seed(), 0xC8E6_91C5_AC7E_5D0C);
    assert_eq!(alpha.record().genetic_stats(), [30, 31, 31, 24, 31, 31]);

    let plain = OutbreakProfile::new(1)
        .with_alpha_guarantee(0)
        .spawn(generator_seed);
    assert_eq!(plain.record().genetic_stats(), [22, 20, 26, 15, 13, 30]);
}
