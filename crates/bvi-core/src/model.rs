//! Problem-model interfaces consumed by the search graph

use crate::{SparseVector, StateVector};

/// Outcome distribution of one `(state, action)` pair, indexed by outcome
pub type OutcomeProbVector = SparseVector;

/// Capability for evaluating an initial bound on unexplored states
pub trait BoundGenerator {
    /// Bound on the optimal value of `state`
    fn value(&self, state: &StateVector) -> f64;
}

impl<F> BoundGenerator for F
where
    F: Fn(&StateVector) -> f64,
{
    fn value(&self, state: &StateVector) -> f64 {
        self(state)
    }
}

/// A discrete-action Markov decision process.
///
/// Outcomes are numbered `0..outcome_probs(s, a).dim()`; `next_state` maps an
/// outcome index to the successor state. For a belief-space MDP derived from a
/// POMDP the outcomes are observations and states are beliefs.
pub trait Mdp {
    /// Number of actions available in every state
    fn num_actions(&self) -> usize;

    /// Discount factor in `(0, 1]`
    fn discount(&self) -> f64;

    /// State the search is rooted at
    fn initial_state(&self) -> StateVector;

    /// Expected immediate reward for taking `action` in `state`
    fn reward(&self, state: &StateVector, action: usize) -> f64;

    /// Outcome probabilities for taking `action` in `state`
    fn outcome_probs(&self, state: &StateVector, action: usize) -> OutcomeProbVector;

    /// Successor state reached through `outcome`
    fn next_state(&self, state: &StateVector, action: usize, outcome: usize) -> StateVector;

    /// Generator for initial lower bounds
    fn new_lower_bound(&self) -> Box<dyn BoundGenerator>;

    /// Generator for initial upper bounds
    fn new_upper_bound(&self) -> Box<dyn BoundGenerator>;
}

/// Check the parts of a model the search relies on.
///
/// # Errors
///
/// Returns [`crate::BoundError::InvalidModel`] if the discount is outside
/// `(0, 1]` or the model has no actions.
pub fn validate_model<M: Mdp + ?Sized>(model: &M) -> crate::Result<()> {
    let discount = model.discount();
    if !(discount > 0.0 && discount <= 1.0) {
        return Err(crate::BoundError::InvalidModel(format!(
            "discount must lie in (0, 1], got {discount}"
        )));
    }
    if model.num_actions() == 0 {
        return Err(crate::BoundError::InvalidModel(
            "model has no actions".to_string(),
        ));
    }
    Ok(())
}
