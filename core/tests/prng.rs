use encounter_oracle_core::{Xoroshiro128Plus, SEED_CONSTANT};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn random_states(count: usize, seed: u64) -> Vec<Xoroshiro128Plus> {
    let mut source = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| Xoroshiro128Plus::from_state(source.gen(), source.gen()))
        .collect()
}

#[test]
fn previous_inverts_next_for_random_states() {
    for original in random_states(10_000, 0x5eed_0001) {
        let mut rng = original;
        let drawn = rng.next_u64();
        let undone = rng.previous_u64();

        assert_eq!(rng, original, "state not restored for {original:?}");
        assert_eq!(drawn, undone, "previous must return the undone output");
    }
}

#[test]
fn next_inverts_previous_for_random_states() {
    for original in random_states(10_000, 0x5eed_0002) {
        let mut rng = original;
        let undone = rng.previous_u64();
        let redrawn = rng.next_u64();

        assert_eq!(rng, original, "state not restored for {original:?}");
        assert_eq!(undone, redrawn);
    }
}

#[test]
fn long_walks_rewind_exactly() {
    let start = Xoroshiro128Plus::new(0x1234_5678_9abc_def0);
    let mut rng = start;
    let forward: Vec<u64> = (0..512).map(|_| rng.next_u64()).collect();
    let mut backward: Vec<u64> = (0..512).map(|_| rng.previous_u64()).collect();
    backward.reverse();

    assert_eq!(forward, backward);
    assert_eq!(rng, start);
}

#[test]
fn bounded_stays_below_maximum() {
    let maxima = [1, 2, 3, 6, 25, 32, 252, 0xFFFF_FFFF];
    let mut rng = Xoroshiro128Plus::new(0xdead_beef);

    for max in maxima {
        for _ in 0..100_000 {
            let value = rng.bounded(max);
            assert!(value < max, "bounded({max}) produced {value}");
        }
    }
}

#[test]
fn bounded_rejects_instead_of_reducing() {
    let mut reference = Xoroshiro128Plus::new(7);
    let mut rng = reference;

    let expected = loop {
        let candidate = reference.next_u64() & 0x7;
        if candidate < 6 {
            break candidate;
        }
    };

    assert_eq!(rng.bounded(6), expected);
    assert_eq!(rng, reference, "rejected draws must be consumed");
}

#[test]
fn reseed_discards_history() {
    let mut rng = Xoroshiro128Plus::new(1);
    let _ = rng.next_u64();
    rng.reseed(99);

    assert_eq!(rng.state(), (99, SEED_CONSTANT));
    assert_eq!(rng, Xoroshiro128Plus::new(99));
}

#[test]
#[should_panic(expected = "non-zero maximum")]
fn bounded_zero_is_a_caller_bug() {
    let _ = Xoroshiro128Plus::new(0).bounded(0);
}
