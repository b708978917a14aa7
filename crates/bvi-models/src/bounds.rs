//! Simple bound generators

use bvi_core::{BoundGenerator, StateVector};

/// The same bound for every state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantBound(pub f64);

impl BoundGenerator for ConstantBound {
    fn value(&self, _state: &StateVector) -> f64 {
        self.0
    }
}

/// Per-state bounds for a tabular model, looked up by state index.
///
/// States outside the table fall back to `default`.
#[derive(Debug, Clone, PartialEq)]
pub struct TableBound {
    /// Bound of each state index
    pub values: Vec<f64>,
    /// Bound for states missing from the table
    pub default: f64,
}

impl TableBound {
    /// Create a table bound
    #[must_use]
    pub fn new(values: Vec<f64>, default: f64) -> Self {
        Self { values, default }
    }
}

impl BoundGenerator for TableBound {
    fn value(&self, state: &StateVector) -> f64 {
        crate::tabular::index_of(state)
            .and_then(|i| self.values.get(i).copied())
            .unwrap_or(self.default)
    }
}
