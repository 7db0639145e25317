//! Domain models for numeval.
//!
//! - `TestCase`: one labeled pipeline input
//! - `ExtractionResult` / `ComputationResult`: per-stage outputs
//! - `CaseReport` / `RunReport`: harness output
//! - `NumevalError`: error taxonomy

pub mod case;
pub mod error;
pub mod report;

pub use case::{
    suite_digest, ComputationResult, EvaluationOutcome, ExtractionResult, TestCase,
};
pub use error::{FailureKind, NumevalError, Result};
pub use report::{CaseFailure, CaseReport, RunReport, RunSummary};
