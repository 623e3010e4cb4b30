use encounter_oracle_core::{
    FilterCriteria, Population, SearchError, SearchOutcome, SlotRange, OUTBREAK_SLOT_TOTAL,
};
use encounter_oracle_hierarchy::SpawnHierarchy;
use encounter_oracle_system_encounter::{OutbreakProfile, Spawner};
use encounter_oracle_system_linear_search::{MassOutbreak, MassOutbreakConfig, SpawnKind};

const RAW_SEED: u64 = 0x1000_0000_0000_0000;

fn outbreak(population: u32, ceiling: u32) -> MassOutbreak {
    let population = Population::new(population).expect("population covers the initial spawn");
    MassOutbreak::new(MassOutbreakConfig::new(population, ceiling))
}

#[test]
fn round_spawns_initial_batch_then_respawns() {
    let search = outbreak(10, 0);
    let profile = OutbreakProfile::new(1);
    let mut hierarchy = SpawnHierarchy::from_raw_seed(RAW_SEED);
    let mut reference = hierarchy.clone();

    let round = search.simulate_round(&mut hierarchy, &profile, &FilterCriteria::new());

    assert_eq!(round.spawns().len(), 10);
    for index in 0..4 {
        let spawn = round.spawns()[index as usize];
        assert_eq!(spawn.kind(), SpawnKind::Initial { index });
        assert_eq!(
            spawn.encounter().generator_seed(),
            reference.advance_one().generator_seed()
        );
        assert!(spawn.matched());
    }
    let group_seed = reference.commit();
    assert_eq!(round.group_seed(), group_seed);
    assert_eq!(hierarchy, reference);

    let mut respawns = SpawnHierarchy::from_group_seed(group_seed);
    for index in 0..6 {
        let spawn = round.spawns()[4 + index as usize];
        assert_eq!(spawn.kind(), SpawnKind::Respawn { index });
        assert_eq!(
            *spawn.encounter(),
            profile.spawn(respawns.advance_one().generator_seed())
        );
        let _ = respawns.commit();
    }
}

#[test]
fn rare_round_search_matches_recorded_advance() {
    let search = outbreak(10, 50_000);
    let mut hierarchy = SpawnHierarchy::from_raw_seed(RAW_SEED);
    let filter = FilterCriteria::new().with_rare(true);

    let found = search
        .next_matching_round(&mut hierarchy, &OutbreakProfile::new(26), &filter)
        .expect("filter is satisfiable")
        .into_found()
        .expect("match within the ceiling");

    assert_eq!(found.advance(), 13);
    assert_eq!(found.round().group_seed(), 0xD443_2944_D07E_7A99);
    assert_eq!(found.round().spawns().len(), 10, "whole round is reported");

    let matches: Vec<_> = found.round().matches().collect();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].kind(), SpawnKind::Initial { index: 3 });
    assert_eq!(matches[0].encounter().seed(), 0xDBCD_052E_A5ED_48E3);
    assert!(matches[0].encounter().record().is_rare());
}

#[test]
fn round_search_respects_ceiling() {
    let search = outbreak(10, 12);
    let mut hierarchy = SpawnHierarchy::from_raw_seed(RAW_SEED);
    let filter = FilterCriteria::new().with_rare(true);

    let outcome = search
        .next_matching_round(&mut hierarchy, &OutbreakProfile::new(26), &filter)
        .expect("filter is satisfiable");

    assert_eq!(outcome, SearchOutcome::Exhausted { ceiling: 12 });
    assert_eq!(hierarchy, SpawnHierarchy::from_raw_seed(RAW_SEED));
}

#[test]
fn alpha_filter_finds_alpha_respawn() {
    let search = outbreak(10, 1000);
    let mut hierarchy = SpawnHierarchy::from_raw_seed(RAW_SEED);
    let filter = FilterCriteria::new().with_alpha(true);

    let profile = OutbreakProfile::new(1).with_alpha_guarantee(0);

    let found = search
        .next_matching_round(&mut hierarchy, &profile, &filter)
        .expect("filter is satisfiable")
        .into_found()
        .expect("match within the ceiling");

    assert_eq!(found.advance(), 26);
    let alpha = found
        .round()
        .matches()
        .next()
        .expect("matching round has a match");
    assert_eq!(alpha.kind(), SpawnKind::Respawn { index: 3 });
    assert_eq!(alpha.encounter().seed(), 0x0244_3ED5_5EC2_FF4D);
    assert!(alpha.encounter().is_alpha());
    assert_eq!(alpha.encounter().record().genetic_stats(), [18, 23, 16, 19, 10, 28]);
}

#[test]
fn empty_slot_range_is_rejected_before_simulating() {
    let search = outbreak(10, 10);
    let mut hierarchy = SpawnHierarchy::from_raw_seed(RAW_SEED);
    let before = hierarchy.snapshot();
    let filter = FilterCriteria::new().with_slot_range(SlotRange::new(5.0, 5.0, 101.0));

    let result = search.next_matching_round(&mut hierarchy, &OutbreakProfile::new(1), &filter);

    assert_eq!(result, Err(SearchError::ImpossibleFilter));
    assert_eq!(hierarchy.snapshot(), before);
}

#[test]
fn slot_ranges_must_be_measured_out_of_the_outbreak_total() {
    let search = outbreak(10, 10);
    let mut hierarchy = SpawnHierarchy::from_raw_seed(RAW_SEED);
    let filter = FilterCriteria::new().with_slot_range(SlotRange::new(0.0, 5.0, 100.0));

    let result = search.next_matching_round(&mut hierarchy, &OutbreakProfile::new(1), &filter);

    assert_eq!(
        result,
        Err(SearchError::SlotTotalMismatch {
            range_total: 100.0,
            spawner_total: OUTBREAK_SLOT_TOTAL,
        })
    );
    assert_eq!(hierarchy, SpawnHierarchy::from_raw_seed(RAW_SEED));
}
