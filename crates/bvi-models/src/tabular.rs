//! Tabular discrete MDP

use ndarray::{Array2, Array3, Axis};
use tracing::debug;

use bvi_core::{
    BoundError, BoundGenerator, Mdp, OutcomeProbVector, Result, SparseVector, StateVector,
};

use crate::bounds::ConstantBound;

/// Tolerance when checking that transition rows sum to one
const ROW_SUM_TOLERANCE: f64 = 1e-6;

/// Encode state index `i` as a one-dimensional state vector
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn state_of(index: usize) -> StateVector {
    SparseVector::from_dense(&[index as f64])
}

/// Decode a state vector produced by [`state_of`]
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn index_of(state: &StateVector) -> Option<usize> {
    let raw = state.get(0);
    if state.dim() != 1 || raw < 0.0 || raw.fract() != 0.0 {
        return None;
    }
    Some(raw as usize)
}

/// A finite MDP given by explicit reward and transition tables.
///
/// States are numbered `0..num_states` and encoded as one-dimensional state
/// vectors holding the index. Outcome `o` of any action is "move to state
/// `o`".
#[derive(Debug, Clone)]
pub struct TabularMdp {
    /// `rewards[[s, a]]`
    rewards: Array2<f64>,
    /// `transitions[[a, s, s']]`
    transitions: Array3<f64>,
    discount: f64,
    initial_state: usize,
}

impl TabularMdp {
    /// Create a new tabular MDP
    ///
    /// # Errors
    ///
    /// Returns [`BoundError::DimensionMismatch`] if the tables disagree on
    /// shape and [`BoundError::InvalidModel`] for a discount outside
    /// `(0, 1)`, an out-of-range initial state, or a transition row that is
    /// not a probability distribution.
    pub fn new(
        rewards: Array2<f64>,
        transitions: Array3<f64>,
        discount: f64,
        initial_state: usize,
    ) -> Result<Self> {
        let (num_states, num_actions) = rewards.dim();
        if num_actions == 0 || num_states == 0 {
            return Err(BoundError::InvalidModel(
                "model needs at least one state and one action".to_string(),
            ));
        }
        let (t_actions, t_states, t_next) = transitions.dim();
        if t_actions != num_actions {
            return Err(BoundError::DimensionMismatch {
                expected: num_actions,
                actual: t_actions,
            });
        }
        if t_states != num_states || t_next != num_states {
            return Err(BoundError::DimensionMismatch {
                expected: num_states,
                actual: if t_states == num_states { t_next } else { t_states },
            });
        }
        if !(discount > 0.0 && discount < 1.0) {
            return Err(BoundError::InvalidModel(format!(
                "tabular models need a discount in (0, 1), got {discount}"
            )));
        }
        if initial_state >= num_states {
            return Err(BoundError::InvalidModel(format!(
                "initial state {initial_state} out of range for {num_states} states"
            )));
        }

        for (a, per_action) in transitions.axis_iter(Axis(0)).enumerate() {
            for (s, row) in per_action.axis_iter(Axis(0)).enumerate() {
                if row.iter().any(|p| *p < 0.0) {
                    return Err(BoundError::InvalidModel(format!(
                        "negative transition probability at action {a}, state {s}"
                    )));
                }
                let total = row.sum();
                if (total - 1.0).abs() > ROW_SUM_TOLERANCE {
                    return Err(BoundError::InvalidModel(format!(
                        "transition row for action {a}, state {s} sums to {total}"
                    )));
                }
            }
        }

        debug!(num_states, num_actions, discount, "built tabular MDP");
        Ok(Self {
            rewards,
            transitions,
            discount,
            initial_state,
        })
    }

    /// Build from nested vectors: `rewards[s][a]` and `transitions[a][s][s']`
    ///
    /// # Errors
    ///
    /// Returns [`BoundError::DimensionMismatch`] for ragged tables, otherwise
    /// as [`TabularMdp::new`].
    pub fn from_tables(
        rewards: &[Vec<f64>],
        transitions: &[Vec<Vec<f64>>],
        discount: f64,
        initial_state: usize,
    ) -> Result<Self> {
        let num_states = rewards.len();
        let num_actions = rewards.first().map_or(0, Vec::len);

        let flat_rewards = flatten(rewards.iter().map(Vec::as_slice), num_actions)?;
        let rewards = Array2::from_shape_vec((num_states, num_actions), flat_rewards)
            .map_err(|e| BoundError::Other(e.into()))?;

        let mut flat_transitions = Vec::with_capacity(transitions.len() * num_states * num_states);
        for per_action in transitions {
            if per_action.len() != num_states {
                return Err(BoundError::DimensionMismatch {
                    expected: num_states,
                    actual: per_action.len(),
                });
            }
            flat_transitions.extend(flatten(per_action.iter().map(Vec::as_slice), num_states)?);
        }
        let transitions =
            Array3::from_shape_vec((transitions.len(), num_states, num_states), flat_transitions)
                .map_err(|e| BoundError::Other(e.into()))?;

        Self::new(rewards, transitions, discount, initial_state)
    }

    /// Number of states
    #[must_use]
    pub fn num_states(&self) -> usize {
        self.rewards.nrows()
    }

    /// Smallest and largest immediate reward
    #[must_use]
    pub fn reward_range(&self) -> (f64, f64) {
        self.rewards
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
                (lo.min(*r), hi.max(*r))
            })
    }

    /// Value of the best single action repeated forever from the worst state.
    ///
    /// This is the blind-policy lower bound `max_a min_s R(s, a) / (1 - discount)`.
    #[must_use]
    pub fn blind_lower_value(&self) -> f64 {
        let best_worst = self
            .rewards
            .axis_iter(Axis(1))
            .map(|column| column.iter().copied().fold(f64::INFINITY, f64::min))
            .fold(f64::NEG_INFINITY, f64::max);
        best_worst / (1.0 - self.discount)
    }

    /// Upper bound `max_{s,a} R(s, a) / (1 - discount)`
    #[must_use]
    pub fn blind_upper_value(&self) -> f64 {
        self.reward_range().1 / (1.0 - self.discount)
    }

    fn lookup_index(&self, state: &StateVector) -> usize {
        // Undecodable states map to state 0; indices past the table clamp to the last state.
        index_of(state).map_or(0, |i| i.min(self.num_states() - 1))
    }
}

fn flatten<'a, I>(rows: I, width: usize) -> Result<Vec<f64>>
where
    I: Iterator<Item = &'a [f64]>,
{
    let mut out = Vec::new();
    for row in rows {
        if row.len() != width {
            return Err(BoundError::DimensionMismatch {
                expected: width,
                actual: row.len(),
            });
        }
        out.extend_from_slice(row);
    }
    Ok(out)
}

impl Mdp for TabularMdp {
    fn num_actions(&self) -> usize {
        self.rewards.ncols()
    }

    fn discount(&self) -> f64 {
        self.discount
    }

    fn initial_state(&self) -> StateVector {
        state_of(self.initial_state)
    }

    fn reward(&self, state: &StateVector, action: usize) -> f64 {
        self.rewards[[self.lookup_index(state), action]]
    }

    fn outcome_probs(&self, state: &StateVector, action: usize) -> OutcomeProbVector {
        let s = self.lookup_index(state);
        let row = self.transitions.index_axis(Axis(0), action);
        let row = row.index_axis(Axis(0), s);
        SparseVector::from_dense(&row.to_vec())
    }

    fn next_state(&self, _state: &StateVector, _action: usize, outcome: usize) -> StateVector {
        state_of(outcome)
    }

    fn new_lower_bound(&self) -> Box<dyn BoundGenerator> {
        Box::new(ConstantBound(self.blind_lower_value()))
    }

    fn new_upper_bound(&self) -> Box<dyn BoundGenerator> {
        Box::new(ConstantBound(self.blind_upper_value()))
    }
}
