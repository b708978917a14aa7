//! Lazily expanded search graph with Bellman bound propagation

use tracing::trace;

use bvi_core::config::SearchConfig;
use bvi_core::model::validate_model;
use bvi_core::{BoundError, BoundGenerator, Mdp, Result, StateVector, ValueInterval};

use crate::index::StateIndex;
use crate::node::{ActionEntry, Edge, GraphNode, NodeId};

/// Counters accumulated over the life of a search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Nodes expanded
    pub expansions: u64,
    /// Bound backups performed
    pub backups: u64,
    /// Trials started by the driver
    pub trials: u64,
}

/// Bounded value search over a lazily expanded graph.
///
/// Every node holds a lower and upper bound on its optimal value. Backups
/// propagate successor bounds through the relaxed Bellman equation
/// `r(s, a) + discount * max_o bound(s')`, and trials refine the bounds along
/// the path that most likely causes the root gap.
pub struct RelaxBound<'m, M: Mdp + ?Sized> {
    pub(crate) problem: &'m M,
    pub(crate) config: SearchConfig,
    lower: Box<dyn BoundGenerator>,
    upper: Box<dyn BoundGenerator>,
    pub(crate) index: StateIndex,
    pub(crate) root: NodeId,
    pub(crate) stats: SearchStats,
}

impl<'m, M: Mdp + ?Sized> RelaxBound<'m, M> {
    /// Set up the search rooted at the problem's initial state
    ///
    /// # Errors
    ///
    /// Returns [`BoundError::InvalidModel`] if the model fails validation, or
    /// [`BoundError::InvalidConfig`] for a negative outcome epsilon.
    pub fn new(problem: &'m M, config: &SearchConfig) -> Result<Self> {
        validate_model(problem)?;
        if !(config.outcome_prob_epsilon >= 0.0) {
            return Err(BoundError::InvalidConfig(format!(
                "search.outcome_prob_epsilon must be non-negative, got {}",
                config.outcome_prob_epsilon
            )));
        }

        let lower = problem.new_lower_bound();
        let upper = problem.new_upper_bound();
        let mut index = StateIndex::new();
        let (root, _) = index.get_or_insert(&problem.initial_state(), &*lower, &*upper);

        Ok(Self {
            problem,
            config: config.clone(),
            lower,
            upper,
            index,
            root,
            stats: SearchStats::default(),
        })
    }

    /// Return the node for `state`, creating a fringe node if needed
    pub fn get_node(&mut self, state: &StateVector) -> NodeId {
        let (id, created) = self
            .index
            .get_or_insert(state, &*self.lower, &*self.upper);
        if created {
            let node = self.index.node(id);
            trace!(state = %node.state, lb = node.lower_bound, ub = node.upper_bound, "created fringe node");
        }
        id
    }

    /// Materialise the actions and outcomes of a fringe node.
    ///
    /// Outcomes at or below the configured probability epsilon are recorded
    /// as absent. Expanding a node that is already expanded leaves it alone.
    pub fn expand(&mut self, id: NodeId) {
        if !self.index.node(id).is_fringe() {
            return;
        }

        let state = self.index.node(id).state.clone();
        let epsilon = self.config.outcome_prob_epsilon;
        let num_actions = self.problem.num_actions();

        let mut actions = Vec::with_capacity(num_actions);
        for a in 0..num_actions {
            let immediate_reward = self.problem.reward(&state, a);
            let probs = self.problem.outcome_probs(&state, a);

            let mut outcomes = vec![None; probs.dim()];
            for (o, prob) in probs.iter() {
                if prob > epsilon {
                    let next = self.problem.next_state(&state, a, o);
                    let successor = self.get_node(&next);
                    outcomes[o] = Some(Edge { prob, successor });
                }
            }

            actions.push(ActionEntry {
                immediate_reward,
                lower_bound: f64::NEG_INFINITY,
                upper_bound: f64::INFINITY,
                outcomes,
            });
        }

        self.index.node_mut(id).actions = actions;
        self.stats.expansions += 1;
    }

    /// Recompute the bounds of `id`, expanding it first if it is fringe.
    ///
    /// Returns the first action achieving the maximal upper bound, or `None`
    /// for a node without actions.
    pub fn backup(&mut self, id: NodeId) -> Option<usize> {
        if self.index.node(id).is_fringe() {
            self.expand(id);
        }
        self.update_internal(id)
    }

    fn update_internal(&mut self, id: NodeId) -> Option<usize> {
        let discount = self.problem.discount();
        let node = self.index.node(id);

        let mut action_bounds = Vec::with_capacity(node.actions.len());
        let mut best_lower = f64::NEG_INFINITY;
        let mut best_upper = f64::NEG_INFINITY;
        let mut best_action = None;

        for (a, entry) in node.actions.iter().enumerate() {
            let mut succ_lower = f64::NEG_INFINITY;
            let mut succ_upper = f64::NEG_INFINITY;
            let mut any_outcome = false;
            for (_, edge) in entry.edges() {
                let succ = self.index.node(edge.successor);
                succ_lower = succ_lower.max(succ.lower_bound);
                succ_upper = succ_upper.max(succ.upper_bound);
                any_outcome = true;
            }
            // An action with every outcome pruned has no future value.
            if !any_outcome {
                succ_lower = 0.0;
                succ_upper = 0.0;
            }

            let lower = entry.immediate_reward + discount * succ_lower;
            let upper = entry.immediate_reward + discount * succ_upper;
            action_bounds.push((lower, upper));

            best_lower = best_lower.max(lower);
            if upper > best_upper {
                best_upper = upper;
                best_action = Some(a);
            }
        }

        let node = self.index.node_mut(id);
        for (entry, (lower, upper)) in node.actions.iter_mut().zip(action_bounds) {
            entry.lower_bound = lower;
            entry.upper_bound = upper;
        }
        if best_action.is_some() {
            // Cached bounds only ever tighten.
            node.lower_bound = node.lower_bound.max(best_lower);
            node.upper_bound = node.upper_bound.min(best_upper);
        }

        self.stats.backups += 1;
        best_action
    }

    /// Upper bound for `state`.
    ///
    /// Uses the cached bound if the state has a node, otherwise evaluates the
    /// initial upper-bound generator. Never creates a node.
    #[must_use]
    pub fn get_value(&self, state: &StateVector) -> f64 {
        match self.index.lookup(state) {
            Some(id) => self.index.node(id).upper_bound,
            None => self.upper.value(state),
        }
    }

    /// Both bounds for `state`, with the same fallback as [`Self::get_value`]
    #[must_use]
    pub fn interval(&self, state: &StateVector) -> ValueInterval {
        match self.index.lookup(state) {
            Some(id) => self.index.node(id).interval(),
            None => ValueInterval::new(self.lower.value(state), self.upper.value(state)),
        }
    }

    /// Root node of the search
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Borrow a node
    #[must_use]
    pub fn node(&self, id: NodeId) -> &GraphNode {
        self.index.node(id)
    }

    /// Borrow the state identity index
    #[must_use]
    pub fn index(&self) -> &StateIndex {
        &self.index
    }

    /// Counters accumulated so far
    #[must_use]
    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    /// Search configuration in use
    #[must_use]
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }
}
