//! Lazily expanded search graph with bounded value refinement
//!
//! This crate provides:
//! - [`StateIndex`] - one node per distinct state, keyed by canonical key
//! - [`GraphNode`] / [`ActionEntry`] / [`Edge`] - the expanded graph
//! - [`RelaxBound`] - Bellman backups and the trial-recursion driver

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod index;
pub mod node;
pub mod relax;
pub mod trial;

pub use index::StateIndex;
pub use node::{ActionEntry, Edge, GraphNode, NodeId};
pub use relax::{RelaxBound, SearchStats};
pub use trial::TrialReport;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{NodeId, RelaxBound, TrialReport};
    pub use bvi_core::prelude::*;
}
