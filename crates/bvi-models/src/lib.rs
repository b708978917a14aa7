//! Tabular problem models for bounded value iteration
//!
//! These models stand in for the problem definitions a full solver would
//! load from disk. They are small, exact and cheap to build, which makes
//! them useful for tests and benchmarks of the search core.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bounds;
pub mod tabular;

pub use bounds::{ConstantBound, TableBound};
pub use tabular::{index_of, state_of, TabularMdp};
