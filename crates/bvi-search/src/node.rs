//! Search graph nodes, action entries and edges

use bvi_core::{StateKey, StateVector, ValueInterval};

/// Stable handle of a node in the [`crate::StateIndex`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Arena position of the node
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Transition to a successor with non-negligible probability
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    /// Outcome probability
    pub prob: f64,
    /// Successor node
    pub successor: NodeId,
}

/// Cached Bellman data for one action of an expanded node
#[derive(Debug, Clone, PartialEq)]
pub struct ActionEntry {
    /// Expected immediate reward
    pub immediate_reward: f64,
    /// Action lower bound from the last backup
    pub lower_bound: f64,
    /// Action upper bound from the last backup
    pub upper_bound: f64,
    /// One slot per outcome; `None` where the outcome was pruned
    pub outcomes: Vec<Option<Edge>>,
}

impl ActionEntry {
    /// Iterate over the materialised outcomes with their slot index
    pub fn edges(&self) -> impl Iterator<Item = (usize, &Edge)> + '_ {
        self.outcomes
            .iter()
            .enumerate()
            .filter_map(|(o, e)| e.as_ref().map(|e| (o, e)))
    }
}

/// A state in the search graph.
///
/// A node is *fringe* until it is expanded, at which point `actions` holds
/// one entry per action of the model.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    /// The state this node stands for
    pub state: StateVector,
    /// Identity key the node is registered under
    pub key: StateKey,
    /// Current lower bound on the optimal value
    pub lower_bound: f64,
    /// Current upper bound on the optimal value
    pub upper_bound: f64,
    /// Per-action Bellman data, empty while fringe
    pub actions: Vec<ActionEntry>,
}

impl GraphNode {
    /// Check whether the node is still unexpanded
    #[must_use]
    pub fn is_fringe(&self) -> bool {
        self.actions.is_empty()
    }

    /// Number of actions materialised by expansion
    #[must_use]
    pub fn num_actions(&self) -> usize {
        self.actions.len()
    }

    /// Gap between the cached bounds
    #[must_use]
    pub fn gap(&self) -> f64 {
        self.upper_bound - self.lower_bound
    }

    /// Cached bounds as an interval
    #[must_use]
    pub fn interval(&self) -> ValueInterval {
        ValueInterval::new(self.lower_bound, self.upper_bound)
    }
}
