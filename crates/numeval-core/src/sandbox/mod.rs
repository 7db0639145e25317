//! Sandbox: isolated, time-bounded execution of generated code.
//!
//! Agents hand snippets to a [`CodeSandbox`] and get back captured stdout or a
//! typed [`SandboxFailure`]. The production implementation,
//! [`ProcessSandbox`], runs each snippet in a fresh Python process with an
//! import guard, a memory limit, and a wall-clock timeout.
//!
//! # Modules
//!
//! - [`error`]: `SandboxFailure` / `SandboxErrorKind`
//! - [`policy`]: `ImportPolicy` (numeric and network modules denied)
//! - [`prelude`]: runner script and its exit-code contract
//! - [`execution`]: `SandboxConfig`, `ProcessSandbox`

pub mod error;
pub mod execution;
pub mod policy;
pub mod prelude;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use error::{SandboxErrorKind, SandboxFailure, SandboxResult};
pub use execution::{ProcessSandbox, SandboxConfig};
pub use policy::ImportPolicy;

/// A request to run one snippet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SandboxInvocation {
    pub code: String,
}

impl SandboxInvocation {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

/// Captured output of a successful invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SandboxOutput {
    pub stdout: String,
    pub duration_ms: u64,
}

impl SandboxOutput {
    pub fn new(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            duration_ms: 0,
        }
    }
}

/// Code execution capability used by the agents.
///
/// Implementations must not carry state from one invocation to the next.
#[async_trait]
pub trait CodeSandbox: Send + Sync {
    async fn run(&self, invocation: &SandboxInvocation) -> SandboxResult<SandboxOutput>;
}
