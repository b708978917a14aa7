//! Integration tests for pruning, cache forwarding and policy files

use approx::assert_abs_diff_eq;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use bvi_core::{logging::init_tracing, sample_simplex, PlaneConfig, SparseVector};
use bvi_planes::{read_from_file, write_to_file, LbPlane, PlaneStore};

const DIM: usize = 3;

fn random_store(rng: &mut StdRng, num_states: usize, num_planes: usize) -> PlaneStore {
    let mut store = PlaneStore::new(num_states, &PlaneConfig::default()).unwrap();
    for n in 0..num_planes {
        let values: Vec<f64> = (0..num_states).map(|_| rng.gen_range(-10.0..10.0)).collect();
        let action = rng.gen_range(0..4);
        let plane = if n % 5 == 4 {
            // Some planes only cover the first half of the simplex
            let support: Vec<usize> = (0..num_states / 2).collect();
            let masked: Vec<f64> = values
                .iter()
                .enumerate()
                .map(|(i, v)| if i < num_states / 2 { *v } else { 0.0 })
                .collect();
            LbPlane::masked(SparseVector::from_dense(&masked), action, support).unwrap()
        } else {
            LbPlane::new(SparseVector::from_dense(&values), action)
        };
        store.add_plane(plane).unwrap();
    }
    store
}

#[test]
fn policy_file_round_trip_preserves_answers() {
    init_tracing();
    let mut rng = StdRng::seed_from_u64(2006);
    let mut store = random_store(&mut rng, 6, 40);
    store.prune();

    let file = tempfile::NamedTempFile::new().unwrap();
    write_to_file(&store, file.path()).unwrap();
    let loaded = read_from_file(file.path(), 6, &PlaneConfig::default()).unwrap();
    assert_eq!(loaded.len(), store.len());

    for n in 0..1000 {
        let belief = if n % 2 == 0 {
            sample_simplex(&mut rng, 6)
        } else {
            // Beliefs inside the half-simplex where masked planes apply
            let half = sample_simplex(&mut rng, 3);
            SparseVector::from_entries(6, half.iter()).unwrap()
        };
        let expected = store.best_plane(&belief).and_then(|id| store.plane(id)).unwrap();
        let actual = loaded.best_plane(&belief).and_then(|id| loaded.plane(id)).unwrap();
        assert_eq!(actual.action, expected.action);
        assert_abs_diff_eq!(actual.value(&belief), expected.value(&belief), epsilon = 1e-12);
    }
}

#[test]
fn caches_follow_chains_of_dominators() {
    let mut store = PlaneStore::new(2, &PlaneConfig::default()).unwrap();
    let weak = store.add_plane(LbPlane::new(SparseVector::from_dense(&[0.0, 0.0]), 0)).unwrap();
    let cache = store.register_cache(weak).unwrap();
    let middle = store.add_plane(LbPlane::new(SparseVector::from_dense(&[1.0, 1.0]), 1)).unwrap();
    store.prune();
    assert_eq!(store.resolve(cache), Some(middle));

    let strong = store.add_plane(LbPlane::new(SparseVector::from_dense(&[2.0, 2.0]), 2)).unwrap();
    store.prune();
    assert_eq!(store.resolve(cache), Some(strong));
    assert_eq!(store.ref_count(strong), 1);
    assert_eq!(store.len(), 1);
}

#[test]
fn support_index_matches_membership_after_pruning() {
    let mut rng = StdRng::seed_from_u64(17);
    let mut store = random_store(&mut rng, 8, 60);
    store.prune();

    let index = store.support_index().unwrap();
    for i in 0..8 {
        let mut listed: Vec<_> = index.planes_at(i).to_vec();
        listed.sort();
        let mut expected: Vec<_> = store
            .iter()
            .filter(|(_, plane)| plane.is_defined_at(i))
            .map(|(id, _)| id)
            .collect();
        expected.sort();
        assert_eq!(listed, expected, "dimension {i}");
    }
}

fn plane_strategy() -> impl Strategy<Value = LbPlane> {
    (
        prop::collection::vec(-4i32..4, DIM),
        prop::collection::vec(any::<bool>(), DIM),
        0usize..3,
    )
        .prop_map(|(values, mask, action)| {
            if mask.iter().all(|m| *m) {
                let dense: Vec<f64> = values.iter().map(|v| f64::from(*v)).collect();
                return LbPlane::new(SparseVector::from_dense(&dense), action);
            }
            let support: Vec<usize> = (0..DIM).filter(|i| mask[*i]).collect();
            let dense: Vec<f64> = (0..DIM)
                .map(|i| if mask[i] { f64::from(values[i]) } else { 0.0 })
                .collect();
            LbPlane::masked(SparseVector::from_dense(&dense), action, support).unwrap()
        })
}

fn belief_strategy() -> impl Strategy<Value = SparseVector> {
    prop::collection::vec(0u8..4, DIM)
        .prop_filter("belief needs mass", |w| w.iter().any(|x| *x > 0))
        .prop_map(|weights| {
            let total: f64 = weights.iter().map(|w| f64::from(*w)).sum();
            let dense: Vec<f64> = weights.iter().map(|w| f64::from(*w) / total).collect();
            SparseVector::from_dense(&dense)
        })
}

proptest! {
    #[test]
    fn pruning_never_changes_the_lower_bound(
        planes in prop::collection::vec(plane_strategy(), 1..25),
        beliefs in prop::collection::vec(belief_strategy(), 1..20),
    ) {
        let mut store = PlaneStore::new(DIM, &PlaneConfig::default()).unwrap();
        for plane in planes {
            store.add_plane(plane).unwrap();
        }
        let before: Vec<Option<f64>> = beliefs.iter().map(|b| store.value(b)).collect();
        store.prune();
        let after: Vec<Option<f64>> = beliefs.iter().map(|b| store.value(b)).collect();

        for (x, y) in before.iter().zip(&after) {
            match (x, y) {
                (Some(x), Some(y)) => prop_assert!((x - y).abs() < 1e-9),
                (None, None) => {}
                _ => prop_assert!(false, "applicability changed: {:?} vs {:?}", x, y),
            }
        }
    }

    #[test]
    fn survivors_are_pairwise_undominated(
        planes in prop::collection::vec(plane_strategy(), 1..25),
    ) {
        let mut store = PlaneStore::new(DIM, &PlaneConfig::default()).unwrap();
        for plane in planes {
            store.add_plane(plane).unwrap();
        }
        store.prune();

        let config = store.config().clone();
        let survivors: Vec<&LbPlane> = store.iter().map(|(_, p)| p).collect();
        for (i, a) in survivors.iter().enumerate() {
            for (j, b) in survivors.iter().enumerate() {
                if i != j {
                    prop_assert!(!a.dominates(b, config.prune_epsilon, config.dominance));
                }
            }
        }
    }

    #[test]
    fn forwarded_caches_point_at_dominators(
        planes in prop::collection::vec(plane_strategy(), 1..25),
    ) {
        let mut store = PlaneStore::new(DIM, &PlaneConfig::default()).unwrap();
        let mut caches = Vec::new();
        for plane in planes {
            let id = store.add_plane(plane.clone()).unwrap();
            caches.push((store.register_cache(id).unwrap(), plane));
        }
        store.prune();

        let config = store.config().clone();
        for (cache, original) in &caches {
            let target = store.resolve(*cache).and_then(|id| store.plane(id));
            prop_assert!(target.is_some());
            let target = target.unwrap();
            prop_assert!(target.dominates(original, 1e-6, config.dominance));
        }
    }
}
