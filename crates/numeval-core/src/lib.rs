//! numeval Core Library
//!
//! Two-agent pipeline that pulls numbers out of noisy text and computes over
//! them, plus the harness that scores it against a labeled suite.

pub mod agents;
pub mod config;
pub mod domain;
pub mod evaluator;
pub mod fakes;
pub mod formatting;
pub mod harness;
pub mod lm;
pub mod metrics;
pub mod obs;
pub mod reporting;
pub mod sandbox;
pub mod telemetry;

pub use agents::{ComputationAgent, ExtractionAgent, LoopState};

pub use config::{AgentConfig, HarnessConfig, MissingValuePolicy, ModelConfig};

pub use domain::{
    suite_digest, CaseFailure, CaseReport, ComputationResult, EvaluationOutcome,
    ExtractionResult, FailureKind, NumevalError, Result, RunReport, RunSummary, TestCase,
};

pub use evaluator::{evaluate, Evaluator};

pub use formatting::{parse_number, FormattingPolicy, FormattingVariant, ResultKind};

pub use harness::Harness;

pub use lm::{FieldValues, LanguageModel, LmError, OpenAiChatModel, Predictor, Signature};

pub use reporting::{render_run_summary_md, write_run_report_json, write_run_summary_md};

pub use telemetry::init_tracing;

pub use sandbox::{
    CodeSandbox, ImportPolicy, ProcessSandbox, SandboxConfig, SandboxErrorKind, SandboxFailure,
    SandboxInvocation, SandboxOutput,
};

/// Version of numeval-core
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
