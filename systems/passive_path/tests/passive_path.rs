use std::collections::BTreeSet;

use encounter_oracle_core::{FilterCriteria, Path, Population, SearchError, SlotRange};
use encounter_oracle_hierarchy::derive_group_seed;
use encounter_oracle_system_encounter::OutbreakProfile;
use encounter_oracle_system_passive_path::{path_cost, Config, PassivePathSearch, SearchMode};

const RAW_SEED: u64 = 0x1000_0000_0000_0000;

fn search(population: u32, bound: usize, mode: SearchMode) -> PassivePathSearch {
    let population = Population::new(population).expect("population covers the initial spawn");
    PassivePathSearch::new(Config::new(population, bound, mode))
}

fn rare() -> FilterCriteria {
    FilterCriteria::new().with_rare(true)
}

#[test]
fn rare_search_from_recorded_seed() {
    let group_seed = derive_group_seed(RAW_SEED);
    let report = search(10, 3, SearchMode::FirstMatch)
        .search(group_seed, &OutbreakProfile::new(26), &rare())
        .expect("filter is satisfiable");

    assert_eq!(report.group_seed(), group_seed);
    assert_eq!(report.candidates_simulated(), 17);
    assert_eq!(report.best_cost(), Some(39));
    assert_eq!(report.info().len(), 1);

    let found = &report.info()[&0xBD6D_D264_0C45_D057];
    assert!(found.encounter().record().is_rare());
    assert_eq!(found.paths(), &[Path::new(vec![1, 3, 2])]);
    for path in found.paths() {
        assert_eq!(path.sum(), 6);
    }
}

#[test]
fn exhaustive_mode_finds_the_same_single_match() {
    let group_seed = derive_group_seed(RAW_SEED);
    let first = search(10, 3, SearchMode::FirstMatch)
        .search(group_seed, &OutbreakProfile::new(26), &rare())
        .expect("filter is satisfiable");
    let exhaustive = search(10, 3, SearchMode::Exhaustive)
        .search(group_seed, &OutbreakProfile::new(26), &rare())
        .expect("filter is satisfiable");

    assert_eq!(exhaustive.info(), first.info());
    assert_eq!(exhaustive.candidates_simulated(), 28);
}

#[test]
fn fewer_rolls_find_nothing_within_bound() {
    let group_seed = derive_group_seed(RAW_SEED);
    for rolls in [1, 13] {
        let report = search(10, 3, SearchMode::FirstMatch)
            .search(group_seed, &OutbreakProfile::new(rolls), &rare())
            .expect("filter is satisfiable");

        assert!(report.is_empty(), "rolls {rolls} unexpectedly matched");
        assert_eq!(report.best_cost(), None);
        assert_eq!(report.candidates_simulated(), 28);
    }
}

#[test]
fn first_match_stops_at_the_first_matching_path() {
    let group_seed = derive_group_seed(0x0600_0000_0000_0000);
    let low_slots = FilterCriteria::new().with_slot_range(SlotRange::new(0.0, 5.0, 101.0));
    let profile = OutbreakProfile::new(1);

    let first = search(10, 2, SearchMode::FirstMatch)
        .search(group_seed, &profile, &low_slots)
        .expect("filter is satisfiable");
    assert_eq!(first.candidates_simulated(), 2);
    assert_eq!(first.best_cost(), Some(28));
    assert_eq!(first.info().len(), 1);
    assert_eq!(
        first.info()[&0xA940_2750_B449_09D6].paths(),
        &[Path::new(vec![0, 6])]
    );

    let tier = search(10, 2, SearchMode::CheapestTier)
        .search(group_seed, &profile, &low_slots)
        .expect("filter is satisfiable");
    assert_eq!(tier.candidates_simulated(), 7);
    assert_eq!(tier.best_cost(), Some(28));
    let tier_paths: Vec<(u64, Vec<Path>)> = tier
        .info()
        .iter()
        .map(|(seed, found)| (*seed, found.paths().to_vec()))
        .collect();
    assert_eq!(
        tier_paths,
        vec![
            (0xA940_2750_B449_09D6, vec![Path::new(vec![0, 6])]),
            (0xF0A3_3D19_593E_1CDD, vec![Path::new(vec![4, 2])]),
            (0xF932_6E5E_2693_B23F, vec![Path::new(vec![1, 5])]),
        ]
    );
}

#[test]
fn cheapest_tier_stops_before_longer_paths() {
    let group_seed = derive_group_seed(RAW_SEED);
    let accept_all = FilterCriteria::new();

    let tier = search(8, 2, SearchMode::CheapestTier)
        .search(group_seed, &OutbreakProfile::new(1), &accept_all)
        .expect("filter is satisfiable");
    assert_eq!(tier.candidates_simulated(), 1);
    assert_eq!(tier.best_cost(), Some(13));
    assert_eq!(tier.info().len(), 4);
    for found in tier.info().values() {
        assert_eq!(found.paths(), &[Path::new(vec![4])]);
    }

    let exhaustive = search(8, 2, SearchMode::Exhaustive)
        .search(group_seed, &OutbreakProfile::new(1), &accept_all)
        .expect("filter is satisfiable");
    assert_eq!(exhaustive.candidates_simulated(), 5);
    assert_eq!(exhaustive.info().len(), 14);
}

#[test]
fn final_step_draws_straight_on_without_commits() {
    let group_seed = 0x2222_2222_2222_2222;
    let search = search(10, 3, SearchMode::Exhaustive);
    let profile = OutbreakProfile::new(1);
    let accept_all = FilterCriteria::new();
    let seeds = |steps: Vec<u32>| -> Vec<u64> {
        search
            .simulate_path(group_seed, &Path::new(steps), &profile, &accept_all)
            .expect("valid path")
            .iter()
            .map(|encounter| encounter.seed())
            .collect()
    };

    let initial = [
        0x981D_8011_CA6C_7F41,
        0xE4F1_8455_1E8B_CDAD,
        0xD8E9_949D_6AC9_2A58,
        0xC07A_A0B0_344B_FC4B,
    ];

    let single = seeds(vec![6]);
    assert_eq!(single[..4], initial);
    assert_eq!(single[4..], [0xFEBB_6753_91F2_1794, 0x20C1_36DF_C5CA_CC2D]);

    let wait_then_all = seeds(vec![0, 6]);
    assert_eq!(wait_then_all[..4], initial);
    assert_eq!(
        wait_then_all[4..],
        [
            0x4C93_8F28_59C5_6F3C,
            0x0DB5_48EE_A374_6C9C,
            0x116C_33F5_02A7_453E,
            0x6B12_395D_C687_5F1F,
            0x0AF2_ECB6_458E_1013,
            0xC520_02ED_C5B7_BD02,
        ]
    );

    let one_then_rest = seeds(vec![1, 5]);
    assert_eq!(one_then_rest[..4], initial);
    assert_eq!(
        one_then_rest[4..],
        [
            0x4C93_8F28_59C5_6F3C,
            0xF321_CFC9_E9DC_D3F5,
            0x82A3_973A_FCD4_5C77,
            0x13E5_D74B_A3A1_74C8,
            0xF72E_25E0_985E_7176,
            0xB150_AD6F_E562_7BA7,
        ]
    );

    assert_eq!(seeds(vec![0, 2, 4]).len(), 14);
    assert_eq!(seeds(vec![2, 4]).len(), 10);
    assert_eq!(seeds(vec![1, 3, 2]).len(), 14);
}

#[test]
fn pruning_never_discards_a_cheaper_match() {
    let profile = OutbreakProfile::new(26);
    let filters = [
        rare(),
        FilterCriteria::new().with_alpha(true),
        FilterCriteria::new().with_slot_range(SlotRange::new(0.0, 2.0, 101.0)),
    ];

    for raw in [RAW_SEED, 0x2000_0000_0000_0000, 0xdead_beef_0bad_f00d] {
        let group_seed = derive_group_seed(raw);
        for filter in &filters {
            let first = search(10, 3, SearchMode::FirstMatch)
                .search(group_seed, &profile, filter)
                .expect("filter is satisfiable");
            let tier = search(10, 3, SearchMode::CheapestTier)
                .search(group_seed, &profile, filter)
                .expect("filter is satisfiable");
            let exhaustive = search(10, 3, SearchMode::Exhaustive)
                .search(group_seed, &profile, filter)
                .expect("filter is satisfiable");

            let population = Population::new(10).expect("valid population");
            let cheapest = exhaustive
                .info()
                .values()
                .flat_map(|found| found.paths())
                .map(|path| path_cost(path, population))
                .min();

            assert_eq!(first.best_cost(), cheapest, "raw {raw:#x} filter {filter:?}");
            assert_eq!(tier.best_cost(), cheapest);
            assert_eq!(exhaustive.best_cost(), cheapest);

            let first_paths: BTreeSet<&Path> =
                first.info().values().flat_map(|found| found.paths()).collect();
            assert!(first_paths.len() <= 1);
            for (seed, found) in first.info().iter().chain(tier.info()) {
                let all = &exhaustive.info()[seed];
                for path in found.paths() {
                    assert!(all.paths().contains(path));
                    assert_eq!(Some(path_cost(path, population)), cheapest);
                }
            }
        }
    }
}

#[test]
fn memoized_search_agrees_with_direct_simulation() {
    let group_seed = derive_group_seed(RAW_SEED);
    let search = search(10, 3, SearchMode::Exhaustive);
    let accept_all = FilterCriteria::new();
    let profile = OutbreakProfile::new(1);

    let report = search
        .search(group_seed, &profile, &accept_all)
        .expect("filter is satisfiable");

    for (seed, found) in report.info() {
        for path in found.paths() {
            let direct = search
                .simulate_path(group_seed, path, &profile, &accept_all)
                .expect("search only emits valid paths");
            assert!(
                direct.iter().any(|encounter| encounter.seed() == *seed),
                "path {path} does not reproduce {seed:#x}"
            );
        }
    }
}

#[test]
fn explicit_paths_are_validated() {
    let search = search(10, 3, SearchMode::FirstMatch);
    let group_seed = derive_group_seed(RAW_SEED);
    let profile = OutbreakProfile::new(1);

    let result = search.simulate_path(group_seed, &Path::new(vec![1, 2]), &profile, &rare());
    assert!(matches!(result, Err(SearchError::InvalidPath { .. })));

    let direct = search
        .simulate_path(group_seed, &Path::new(vec![1, 3, 2]), &OutbreakProfile::new(26), &rare())
        .expect("valid path");
    assert_eq!(direct.len(), 1);
    assert_eq!(direct[0].seed(), 0xBD6D_D264_0C45_D057);
}

#[test]
fn impossible_filter_is_rejected() {
    let filter = FilterCriteria::new().with_slot_range(SlotRange::new(3.0, 3.0, 101.0));
    let result = search(10, 3, SearchMode::FirstMatch).search(
        derive_group_seed(RAW_SEED),
        &OutbreakProfile::new(1),
        &filter,
    );

    assert_eq!(result, Err(SearchError::ImpossibleFilter));
}

#[test]
fn slot_ranges_must_be_measured_out_of_the_outbreak_total() {
    let filter = FilterCriteria::new().with_slot_range(SlotRange::new(0.0, 5.0, 100.0));
    let search = search(10, 3, SearchMode::FirstMatch);
    let group_seed = derive_group_seed(RAW_SEED);
    let profile = OutbreakProfile::new(1);
    let mismatch = SearchError::SlotTotalMismatch {
        range_total: 100.0,
        spawner_total: 101.0,
    };

    assert_eq!(search.search(group_seed, &profile, &filter), Err(mismatch.clone()));
    assert_eq!(
        search.simulate_path(group_seed, &Path::new(vec![6]), &profile, &filter),
        Err(mismatch)
    );
}
