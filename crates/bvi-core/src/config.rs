//! Solver configuration
//!
//! Every tuning constant of the search graph and the plane store lives here
//! so it can be overridden from a JSON file instead of being baked in.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{BoundError, Result};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Search graph and trial settings
    pub search: SearchConfig,
    /// Lower-bound plane store settings
    pub planes: PlaneConfig,
}

/// Configuration for the lazily expanded search graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Outcomes with probability at or below this are not materialised
    pub outcome_prob_epsilon: f64,
    /// Root gap at which `initialize` stops
    pub target_precision: f64,
    /// Optional cap on the number of trials run by `initialize`
    pub max_trials: Option<u64>,
    /// Optional cap on trial recursion depth (useful when discount is 1)
    pub max_depth: Option<u32>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            outcome_prob_epsilon: 1e-10,
            target_precision: 1e-3,
            max_trials: None,
            max_depth: None,
        }
    }
}

/// How planes are compared for applicability and dominance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DominanceMode {
    /// Planes are partial functions restricted to their support mask
    Masked,
    /// Planes are total functions; masks are ignored
    Unmasked,
}

/// Configuration for the max-planes lower bound
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaneConfig {
    /// Comparison strategy
    pub dominance: DominanceMode,
    /// Maintain a per-dimension index of planes to speed up lookups
    pub use_support_list: bool,
    /// Drop planes that no external cache refers to
    pub use_ref_count_prune: bool,
    /// Tolerance used by the dominance test
    pub prune_epsilon: f64,
    /// Minimum growth in plane count before the next automatic prune
    pub prune_increment: usize,
    /// Relative growth in plane count before the next automatic prune
    pub prune_factor: f64,
}

impl Default for PlaneConfig {
    fn default() -> Self {
        Self {
            dominance: DominanceMode::Masked,
            use_support_list: true,
            use_ref_count_prune: false,
            prune_epsilon: 1e-10,
            prune_increment: 10,
            prune_factor: 1.1,
        }
    }
}

impl SolverConfig {
    /// Validate value ranges
    ///
    /// # Errors
    ///
    /// Returns [`BoundError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let search = &self.search;
        if !(search.outcome_prob_epsilon >= 0.0 && search.outcome_prob_epsilon < 1.0) {
            return Err(BoundError::InvalidConfig(format!(
                "search.outcome_prob_epsilon must lie in [0, 1), got {}",
                search.outcome_prob_epsilon
            )));
        }
        if !(search.target_precision > 0.0) {
            return Err(BoundError::InvalidConfig(format!(
                "search.target_precision must be positive, got {}",
                search.target_precision
            )));
        }

        let planes = &self.planes;
        if !(planes.prune_epsilon >= 0.0) {
            return Err(BoundError::InvalidConfig(format!(
                "planes.prune_epsilon must be non-negative, got {}",
                planes.prune_epsilon
            )));
        }
        if !(planes.prune_factor >= 1.0) {
            return Err(BoundError::InvalidConfig(format!(
                "planes.prune_factor must be at least 1, got {}",
                planes.prune_factor
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns [`BoundError::Serialization`] for malformed JSON and
    /// [`BoundError::InvalidConfig`] for out-of-range values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON configuration file
    ///
    /// # Errors
    ///
    /// Returns [`BoundError::Io`] if the file cannot be read, otherwise as
    /// [`SolverConfig::from_json_str`].
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Pretty-printed JSON
    ///
    /// # Errors
    ///
    /// Returns [`BoundError::Serialization`] if encoding fails.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_reference_constants() {
        let config = SolverConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.search.outcome_prob_epsilon, 1e-10);
        assert_eq!(config.search.target_precision, 1e-3);
        assert_eq!(config.planes.prune_increment, 10);
        assert_eq!(config.planes.prune_factor, 1.1);
        assert_eq!(config.planes.dominance, DominanceMode::Masked);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = SolverConfig::from_json_str(
            r#"{ "search": { "target_precision": 0.01 }, "planes": { "dominance": "unmasked" } }"#,
        )
        .unwrap();
        assert_eq!(config.search.target_precision, 0.01);
        assert_eq!(config.search.outcome_prob_epsilon, 1e-10);
        assert_eq!(config.planes.dominance, DominanceMode::Unmasked);
        assert!(config.planes.use_support_list);
    }

    #[test]
    fn rejects_non_positive_precision() {
        let err = SolverConfig::from_json_str(r#"{ "search": { "target_precision": 0.0 } }"#)
            .unwrap_err();
        assert!(matches!(err, BoundError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_shrinking_prune_factor() {
        let mut config = SolverConfig::default();
        config.planes.prune_factor = 0.5;
        assert!(matches!(config.validate(), Err(BoundError::InvalidConfig(_))));
    }

    #[test]
    fn json_file_round_trip() {
        let mut config = SolverConfig::default();
        config.search.max_trials = Some(250);
        config.planes.use_ref_count_prune = true;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_json_string().unwrap().as_bytes())
            .unwrap();

        let loaded = SolverConfig::from_json_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }
}
