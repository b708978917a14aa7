//! State vectors and canonical state keys

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::SparseVector;

/// A state of the underlying process, encoded as a sparse numeric vector
pub type StateVector = SparseVector;

/// Canonical identity key for a state.
///
/// Two numerically equal state vectors always produce the same key. The key
/// is only used for lookup, never for arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateKey(String);

impl StateKey {
    /// Compute the key of `state`
    #[must_use]
    pub fn of(state: &StateVector) -> Self {
        let mut key = String::with_capacity(8 * state.nnz() + 4);
        key.push_str(&state.dim().to_string());
        key.push('|');
        for (n, (i, v)) in state.iter().enumerate() {
            if n > 0 {
                key.push(',');
            }
            // Bit pattern keeps the key exact; `0.0 == -0.0` never reaches
            // here because zeros are not stored.
            key.push_str(&format!("{i}:{:x}", v.to_bits()));
        }
        Self(key)
    }

    /// Borrow the encoded key
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&StateVector> for StateKey {
    fn from(state: &StateVector) -> Self {
        Self::of(state)
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
