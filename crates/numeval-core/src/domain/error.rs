//! Error taxonomy for the numeval pipeline.

use serde::{Deserialize, Serialize};

use crate::lm::LmError;

/// Pipeline errors.
///
/// `Configuration` is fatal for a whole run. Every other variant is scoped to
/// a single test case: the harness records it in the case report and moves on.
#[derive(Debug, thiserror::Error)]
pub enum NumevalError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("computation blocked: no value extracted for {}", .missing.join(", "))]
    ComputationBlocked { missing: Vec<String> },

    #[error("computation incomplete: no final answer after {steps} step(s)")]
    ComputationIncomplete { steps: u32 },

    #[error("extraction failed after {attempts} attempt(s): {last_error}")]
    ExtractionFailed { attempts: u32, last_error: String },

    #[error("model error: {0}")]
    Model(#[from] LmError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl NumevalError {
    /// Coarse classification used in case reports.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            NumevalError::Configuration(_) => FailureKind::Configuration,
            NumevalError::ComputationBlocked { .. } => FailureKind::ComputationBlocked,
            NumevalError::ComputationIncomplete { .. } => FailureKind::ComputationIncomplete,
            NumevalError::ExtractionFailed { .. } => FailureKind::ExtractionFailed,
            NumevalError::Model(_) => FailureKind::Model,
            NumevalError::Serialization(_) | NumevalError::Io(_) => FailureKind::Internal,
        }
    }
}

/// Why a case did not reach evaluation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Configuration,
    ComputationBlocked,
    ComputationIncomplete,
    ExtractionFailed,
    Model,
    Internal,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FailureKind::Configuration => "configuration",
            FailureKind::ComputationBlocked => "computation_blocked",
            FailureKind::ComputationIncomplete => "computation_incomplete",
            FailureKind::ExtractionFailed => "extraction_failed",
            FailureKind::Model => "model",
            FailureKind::Internal => "internal",
        };
        write!(f, "{name}")
    }
}

/// Result type for numeval operations.
pub type Result<T> = std::result::Result<T, NumevalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocked_error_lists_missing_targets() {
        let err = NumevalError::ComputationBlocked {
            missing: vec!["Cost".to_string(), "Tax".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "computation blocked: no value extracted for Cost, Tax"
        );
        assert_eq!(err.failure_kind(), FailureKind::ComputationBlocked);
    }

    #[test]
    fn test_incomplete_error_display() {
        let err = NumevalError::ComputationIncomplete { steps: 6 };
        assert!(err.to_string().contains("after 6 step(s)"));
        assert_eq!(err.failure_kind(), FailureKind::ComputationIncomplete);
    }

    #[test]
    fn test_model_error_converts() {
        let err: NumevalError = LmError::Timeout { timeout_ms: 10 }.into();
        assert_eq!(err.failure_kind(), FailureKind::Model);
        assert!(err.to_string().contains("model error"));
    }

    #[test]
    fn test_failure_kind_serde_is_snake_case() {
        let json = serde_json::to_string(&FailureKind::ComputationIncomplete).unwrap();
        assert_eq!(json, "\"computation_incomplete\"");
        assert_eq!(FailureKind::ExtractionFailed.to_string(), "extraction_failed");
    }
}
