//! Max-planes lower bound over the belief simplex
//!
//! This crate provides:
//! - [`LbPlane`] - an alpha vector tagged with an action and a support mask
//! - [`PlaneStore`] - best-plane lookup, dominance pruning and cache forwarding
//! - [`SupportIndex`] - per-dimension plane lists that narrow lookups
//! - [`policy_file`] - reading and writing stores as policy files

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod plane;
pub mod policy_file;
pub mod store;
pub mod support;

pub use plane::{LbPlane, PlaneId};
pub use policy_file::{read_from_file, read_policy, write_policy, write_to_file};
pub use store::{CacheRef, PlaneStore, PruneReport};
pub use support::SupportIndex;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{LbPlane, PlaneId, PlaneStore, PruneReport};
    pub use bvi_core::prelude::*;
}
