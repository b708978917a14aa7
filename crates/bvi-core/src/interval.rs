//! Lower/upper value intervals

use serde::{Deserialize, Serialize};
use std::fmt;

/// A closed interval `[lower, upper]` bracketing an optimal value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueInterval {
    /// Lower bound
    pub lower: f64,
    /// Upper bound
    pub upper: f64,
}

impl ValueInterval {
    /// Create a new interval
    #[must_use]
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Gap between the bounds
    #[must_use]
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Check whether `value` lies inside the interval
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }

    /// Check whether the two intervals share at least one point
    #[must_use]
    pub fn overlaps_with(&self, other: &ValueInterval) -> bool {
        self.lower <= other.upper && other.lower <= self.upper
    }
}

impl fmt::Display for ValueInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} .. {}]", self.lower, self.upper)
    }
}
