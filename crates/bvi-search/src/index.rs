//! State identity index
//!
//! Owns every [`GraphNode`] in an arena and guarantees at most one node per
//! distinct state. Nodes are never removed.

use std::collections::HashMap;

use bvi_core::{BoundGenerator, StateKey, StateVector};

use crate::node::{GraphNode, NodeId};

/// Arena of graph nodes keyed by canonical state key
#[derive(Debug, Default)]
pub struct StateIndex {
    nodes: Vec<GraphNode>,
    lookup: HashMap<StateKey, NodeId>,
}

impl StateIndex {
    /// Create an empty index
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the node for `state`, creating a fringe node if needed.
    ///
    /// A new node takes its bounds from `lower` and `upper`. The flag is
    /// `true` when the node was created by this call.
    pub fn get_or_insert(
        &mut self,
        state: &StateVector,
        lower: &dyn BoundGenerator,
        upper: &dyn BoundGenerator,
    ) -> (NodeId, bool) {
        let key = StateKey::of(state);
        if let Some(&id) = self.lookup.get(&key) {
            return (id, false);
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(GraphNode {
            state: state.clone(),
            key: key.clone(),
            lower_bound: lower.value(state),
            upper_bound: upper.value(state),
            actions: Vec::new(),
        });
        self.lookup.insert(key, id);
        (id, true)
    }

    /// Find the node for `state` without creating one
    #[must_use]
    pub fn lookup(&self, state: &StateVector) -> Option<NodeId> {
        self.lookup.get(&StateKey::of(state)).copied()
    }

    /// Borrow a node
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by this index.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &GraphNode {
        &self.nodes[id.0]
    }

    /// Mutably borrow a node
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by this index.
    pub fn node_mut(&mut self, id: NodeId) -> &mut GraphNode {
        &mut self.nodes[id.0]
    }

    /// Number of nodes created so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if no node has been created
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over all nodes in creation order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &GraphNode)> + '_ {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bvi_core::SparseVector;

    fn zero(_: &StateVector) -> f64 {
        0.0
    }

    fn ten(_: &StateVector) -> f64 {
        10.0
    }

    #[test]
    fn equal_states_resolve_to_one_node() {
        let mut index = StateIndex::new();
        let a = SparseVector::from_dense(&[0.0, 3.0]);
        let b = SparseVector::from_entries(2, vec![(1, 3.0)]).unwrap();

        let (first, created) = index.get_or_insert(&a, &zero, &ten);
        assert!(created);
        let (second, created) = index.get_or_insert(&b, &zero, &ten);
        assert!(!created);
        assert_eq!(first, second);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn new_nodes_are_fringe_with_generator_bounds() {
        let mut index = StateIndex::new();
        let s = SparseVector::from_dense(&[1.0]);
        let (id, _) = index.get_or_insert(&s, &zero, &ten);
        let node = index.node(id);
        assert!(node.is_fringe());
        assert_eq!(node.lower_bound, 0.0);
        assert_eq!(node.upper_bound, 10.0);
    }

    #[test]
    fn lookup_never_creates() {
        let mut index = StateIndex::new();
        let s = SparseVector::from_dense(&[2.0]);
        assert!(index.lookup(&s).is_none());
        assert!(index.is_empty());
        let (id, _) = index.get_or_insert(&s, &zero, &ten);
        assert_eq!(index.lookup(&s), Some(id));
    }
}
