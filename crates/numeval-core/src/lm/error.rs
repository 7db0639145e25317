//! Error types for language-model calls.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which side of a call failed field validation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SchemaStage {
    Input,
    Output,
}

/// Failure of a single model call. Always scoped to the current case.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LmError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("model API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid model response: {0}")]
    InvalidResponse(String),

    #[error("model call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("schema violation for '{signature}' ({stage:?}): missing field '{field}'")]
    SchemaViolation {
        signature: String,
        stage: SchemaStage,
        field: String,
    },
}

impl From<reqwest::Error> for LmError {
    fn from(err: reqwest::Error) -> Self {
        LmError::Transport(err.to_string())
    }
}
