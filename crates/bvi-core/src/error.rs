//! Error types for the bounded value iteration crates

use thiserror::Error;

/// Core error type for bound computation and policy I/O
#[derive(Error, Debug)]
pub enum BoundError {
    /// Malformed or mismatched policy file
    #[error("{source_name}: line {line}: {message}")]
    PolicyParse {
        /// File name (or other label) of the policy being read
        source_name: String,
        /// One-based line number of the offending line
        line: usize,
        /// What the parser expected
        message: String,
    },

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Problem model failed validation
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    /// Configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A plane handle that no longer refers to a live plane
    #[error("Unknown plane: {0}")]
    UnknownPlane(usize),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl BoundError {
    /// Build a [`BoundError::PolicyParse`] for `source_name` at `line`.
    pub fn parse(source_name: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::PolicyParse {
            source_name: source_name.into(),
            line,
            message: message.into(),
        }
    }
}

/// Result type alias for bound operations
pub type Result<T> = std::result::Result<T, BoundError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_names_file_and_line() {
        let err = BoundError::parse("policy.out", 7, "expected 'action => <int>'");
        assert_eq!(err.to_string(), "policy.out: line 7: expected 'action => <int>'");
    }

    #[test]
    fn dimension_mismatch_message() {
        let err = BoundError::DimensionMismatch {
            expected: 3,
            actual: 4,
        };
        assert_eq!(err.to_string(), "Dimension mismatch: expected 3, got 4");
    }
}
