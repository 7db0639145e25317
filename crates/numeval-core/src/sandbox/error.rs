//! Error types for the sandbox module.

use serde::{Deserialize, Serialize};

/// Classification of a failed sandbox invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SandboxErrorKind {
    SyntaxError,
    RuntimeError,
    TimeoutError,
    ResourceError,
}

impl std::fmt::Display for SandboxErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SandboxErrorKind::SyntaxError => write!(f, "SyntaxError"),
            SandboxErrorKind::RuntimeError => write!(f, "RuntimeError"),
            SandboxErrorKind::TimeoutError => write!(f, "TimeoutError"),
            SandboxErrorKind::ResourceError => write!(f, "ResourceError"),
        }
    }
}

/// A failed sandbox invocation.
///
/// Not fatal: agents feed it back into their reasoning as an observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct SandboxFailure {
    pub kind: SandboxErrorKind,
    pub message: String,
}

impl SandboxFailure {
    pub fn new(kind: SandboxErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(SandboxErrorKind::SyntaxError, message)
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(SandboxErrorKind::RuntimeError, message)
    }

    pub fn timeout(limit_ms: u64) -> Self {
        Self::new(
            SandboxErrorKind::TimeoutError,
            format!("execution exceeded the {limit_ms}ms time budget"),
        )
    }

    pub fn resource(message: impl Into<String>) -> Self {
        Self::new(SandboxErrorKind::ResourceError, message)
    }
}

/// Result type for sandbox operations.
pub type SandboxResult<T> = std::result::Result<T, SandboxFailure>;
