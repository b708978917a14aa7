//! Core types and traits for bounded value iteration
//!
//! This crate provides the shared vocabulary used by the search graph and
//! the lower-bound plane store: sparse vectors, canonical state keys, the
//! problem-model and bound-generator interfaces, solver configuration and
//! the common error type.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod belief;
pub mod config;
pub mod error;
pub mod interval;
pub mod logging;
pub mod model;
pub mod sparse;
pub mod state;

// Re-export core traits and types
pub use belief::{consistent_with, sample_simplex, Belief};
pub use config::{DominanceMode, PlaneConfig, SearchConfig, SolverConfig};
pub use error::{BoundError, Result};
pub use interval::ValueInterval;
pub use model::{validate_model, BoundGenerator, Mdp, OutcomeProbVector};
pub use sparse::SparseVector;
pub use state::{StateKey, StateVector};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Belief, BoundError, BoundGenerator, Mdp, Result, SolverConfig, SparseVector, StateKey,
        StateVector, ValueInterval,
    };
}
