//! End-to-end tests of the trial-recursion search on tabular models

use approx::assert_abs_diff_eq;
use ndarray::{Array2, Array3};
use proptest::prelude::*;

use bvi_core::logging::init_tracing;
use bvi_core::{Mdp, SearchConfig};
use bvi_models::{index_of, state_of, TabularMdp};
use bvi_search::RelaxBound;

/// s0: stay for reward 1 or move to s1 for nothing.
/// s1: stay for reward 2 or move to s0 for nothing.
fn two_state() -> TabularMdp {
    TabularMdp::from_tables(
        &[vec![1.0, 0.0], vec![2.0, 0.0]],
        &[
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            vec![vec![0.0, 1.0], vec![1.0, 0.0]],
        ],
        0.9,
        0,
    )
    .unwrap()
}

/// Exact values of a deterministic tabular model by value iteration
fn exact_values(rewards: &Array2<f64>, next: &Array2<usize>, discount: f64) -> Vec<f64> {
    let (num_states, num_actions) = rewards.dim();
    let mut values = vec![0.0; num_states];
    for _ in 0..5000 {
        values = (0..num_states)
            .map(|s| {
                (0..num_actions)
                    .map(|a| rewards[[s, a]] + discount * values[next[[s, a]]])
                    .fold(f64::NEG_INFINITY, f64::max)
            })
            .collect();
    }
    values
}

#[test]
fn two_state_root_matches_closed_form() {
    init_tracing();
    let mdp = two_state();
    let mut search = RelaxBound::new(&mdp, &SearchConfig::default()).unwrap();
    let report = search.initialize(1e-3).unwrap();

    assert!(report.converged);
    assert!(report.root.width() < 1e-3);
    assert_eq!(report.nodes, 2);
    assert_abs_diff_eq!(search.get_value(&state_of(0)), 18.0, epsilon = 1e-3);
    assert_abs_diff_eq!(search.interval(&state_of(0)).lower, 18.0, epsilon = 1e-3);

    // The best first move is to leave for the better state.
    let root = search.node(search.root());
    let best = root
        .actions
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.upper_bound.total_cmp(&b.upper_bound))
        .map(|(a, _)| a);
    assert_eq!(best, Some(1));
}

#[test]
fn query_for_unseen_state_uses_initial_bound() {
    let mdp = two_state();
    let search = RelaxBound::new(&mdp, &SearchConfig::default()).unwrap();
    assert_abs_diff_eq!(search.get_value(&state_of(1)), 20.0);
    assert_eq!(search.index().len(), 1);
}

#[test]
fn bounds_tighten_monotonically_and_stay_sound() {
    let mdp = two_state();
    let mut search = RelaxBound::new(&mdp, &SearchConfig::default()).unwrap();
    let truth = [18.0, 20.0];

    let mut previous = search.node(search.root()).interval();
    for _ in 0..200 {
        let gap = previous.width();
        if gap < 1e-6 {
            break;
        }
        search.do_trial(gap * mdp.discount());

        let current = search.node(search.root()).interval();
        assert!(current.lower >= previous.lower);
        assert!(current.upper <= previous.upper);
        for (_, node) in search.index().iter() {
            let s = index_of(&node.state).unwrap();
            assert!(node.lower_bound <= truth[s] + 1e-9);
            assert!(node.upper_bound >= truth[s] - 1e-9);
        }
        previous = current;
    }
}

#[test]
fn repeated_runs_are_identical() {
    let mdp = two_state();
    let run = || {
        let mut search = RelaxBound::new(&mdp, &SearchConfig::default()).unwrap();
        let report = search.initialize(1e-4).unwrap();
        let bounds: Vec<(f64, f64)> = search
            .index()
            .iter()
            .map(|(_, n)| (n.lower_bound, n.upper_bound))
            .collect();
        (report.trials, report.backups, report.nodes, report.root, bounds)
    };
    assert_eq!(run(), run());
}

#[test]
fn depth_cap_still_converges() {
    let mdp = two_state();
    let config = SearchConfig {
        max_depth: Some(5),
        ..SearchConfig::default()
    };
    let mut search = RelaxBound::new(&mdp, &config).unwrap();
    let report = search.initialize(1e-3).unwrap();
    assert!(report.converged);
    assert_abs_diff_eq!(report.root.upper, 18.0, epsilon = 1e-3);
}

fn deterministic_model() -> impl Strategy<Value = (Array2<f64>, Array2<usize>)> {
    (2usize..5, 1usize..4).prop_flat_map(|(num_states, num_actions)| {
        let cells = num_states * num_actions;
        (
            prop::collection::vec(0u8..6, cells),
            prop::collection::vec(0..num_states, cells),
        )
            .prop_map(move |(rewards, next)| {
                let rewards = Array2::from_shape_fn((num_states, num_actions), |(s, a)| {
                    f64::from(rewards[s * num_actions + a])
                });
                let next = Array2::from_shape_fn((num_states, num_actions), |(s, a)| {
                    next[s * num_actions + a]
                });
                (rewards, next)
            })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn converged_bounds_bracket_exact_values((rewards, next) in deterministic_model()) {
        let (num_states, num_actions) = rewards.dim();
        let discount = 0.8;
        let transitions = Array3::from_shape_fn((num_actions, num_states, num_states), |(a, s, t)| {
            if next[[s, a]] == t { 1.0 } else { 0.0 }
        });
        let mdp = TabularMdp::new(rewards.clone(), transitions, discount, 0).unwrap();
        let truth = exact_values(&rewards, &next, discount);

        let mut search = RelaxBound::new(&mdp, &SearchConfig::default()).unwrap();
        let report = search.initialize(1e-3).unwrap();
        prop_assert!(report.converged);
        prop_assert!(report.root.lower <= truth[0] + 1e-6);
        prop_assert!(report.root.upper >= truth[0] - 1e-6);

        for (_, node) in search.index().iter() {
            let s = index_of(&node.state).unwrap();
            prop_assert!(node.lower_bound <= truth[s] + 1e-6);
            prop_assert!(node.upper_bound >= truth[s] - 1e-6);
        }
    }
}
