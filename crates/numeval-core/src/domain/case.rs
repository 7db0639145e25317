//! Test cases and the per-stage results produced for them.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One labeled input for the pipeline.
///
/// Immutable once loaded; the harness only ever borrows it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestCase {
    /// Raw, possibly noisy text holding the numbers.
    pub input_text: String,

    /// Keywords whose values must be extracted.
    pub targets: BTreeSet<String>,

    /// Natural-language description of the computation.
    pub function: String,

    /// Expected answer string.
    pub expected: String,
}

impl TestCase {
    pub fn new<I, S>(
        input_text: impl Into<String>,
        targets: I,
        function: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            input_text: input_text.into(),
            targets: targets.into_iter().map(Into::into).collect(),
            function: function.into(),
            expected: expected.into(),
        }
    }
}

/// Output of the extraction stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtractionResult {
    /// Reasoning trace.
    pub thought: String,

    /// Located values, keyed by target. A missing key means "value
    /// unavailable"; it is never filled with a placeholder.
    pub numbers: BTreeMap<String, f64>,
}

impl ExtractionResult {
    /// Targets with no extracted value, in sorted order.
    pub fn missing_targets(&self, targets: &BTreeSet<String>) -> Vec<String> {
        targets
            .iter()
            .filter(|t| !self.numbers.contains_key(*t))
            .cloned()
            .collect()
    }
}

/// Output of the computation stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComputationResult {
    /// Reasoning trace across all loop steps.
    pub thought: String,

    /// Final answer, normalized by the formatting policy when numeric.
    pub answer: String,

    /// Reasoning steps consumed.
    pub steps: u32,
}

/// Result of comparing a produced answer with the expected one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvaluationOutcome {
    pub passed: bool,
}

/// SHA-256 hex digest identifying a suite by its cases, in order.
pub fn suite_digest(cases: &[TestCase]) -> String {
    let mut hasher = Sha256::new();
    for case in cases {
        hasher.update(case.input_text.as_bytes());
        hasher.update([0u8]);
        for target in &case.targets {
            hasher.update(target.as_bytes());
            hasher.update([1u8]);
        }
        hasher.update(case.function.as_bytes());
        hasher.update([0u8]);
        hasher.update(case.expected.as_bytes());
        hasher.update([2u8]);
    }
    hex::encode(hasher.finalize())
}
