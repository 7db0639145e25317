//! Per-case and per-run report types.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::case::{ComputationResult, ExtractionResult, TestCase};
use super::error::{FailureKind, NumevalError};
use crate::formatting::FormattingVariant;

/// Why a case stopped before evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaseFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl From<&NumevalError> for CaseFailure {
    fn from(err: &NumevalError) -> Self {
        Self {
            kind: err.failure_kind(),
            message: err.to_string(),
        }
    }
}

/// Outcome of one test case's pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseReport {
    /// Position of the case in the input suite.
    pub index: usize,
    pub input_text: String,
    pub targets: BTreeSet<String>,
    pub function: String,
    pub expected: String,
    pub produced_answer: Option<String>,
    pub passed: bool,
    /// Targets the extraction stage could not locate.
    pub missing_targets: Vec<String>,
    pub extraction: Option<ExtractionResult>,
    pub computation: Option<ComputationResult>,
    pub failure: Option<CaseFailure>,
    pub duration_ms: u64,
}

impl CaseReport {
    /// A report with no stage output yet.
    pub fn pending(index: usize, case: &TestCase) -> Self {
        Self {
            index,
            input_text: case.input_text.clone(),
            targets: case.targets.clone(),
            function: case.function.clone(),
            expected: case.expected.clone(),
            produced_answer: None,
            passed: false,
            missing_targets: Vec::new(),
            extraction: None,
            computation: None,
            failure: None,
            duration_ms: 0,
        }
    }

    /// Whether the case ended in an error rather than an evaluated answer.
    pub fn errored(&self) -> bool {
        self.failure.is_some()
    }
}

/// Aggregate counts for a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    /// Evaluated but wrong.
    pub failed: usize,
    /// Stopped before evaluation.
    pub errored: usize,
    pub pass_rate: f32,
}

impl RunSummary {
    pub fn from_cases(cases: &[CaseReport]) -> Self {
        let total = cases.len();
        let passed = cases.iter().filter(|c| c.passed).count();
        let errored = cases.iter().filter(|c| c.errored()).count();
        let pass_rate = if total == 0 {
            0.0
        } else {
            passed as f32 / total as f32
        };
        Self {
            total,
            passed,
            failed: total - passed - errored,
            errored,
            pass_rate,
        }
    }
}

/// Full report for one harness run. Cases are in input order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunReport {
    pub run_id: Uuid,
    pub suite_digest: String,
    pub formatting: FormattingVariant,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub summary: RunSummary,
    pub cases: Vec<CaseReport>,
}

impl RunReport {
    /// True when every case passed.
    pub fn all_passed(&self) -> bool {
        self.summary.total == self.summary.passed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(index: usize, passed: bool, failure: Option<FailureKind>) -> CaseReport {
        let case = TestCase::new("a: 1", ["a"], "double a", "2");
        let mut r = CaseReport::pending(index, &case);
        r.passed = passed;
        r.failure = failure.map(|kind| CaseFailure {
            kind,
            message: "boom".to_string(),
        });
        r
    }

    #[test]
    fn test_summary_counts_partition_cases() {
        let cases = vec![
            report(0, true, None),
            report(1, false, None),
            report(2, false, Some(FailureKind::ComputationIncomplete)),
            report(3, true, None),
        ];
        let summary = RunSummary::from_cases(&cases);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.errored, 1);
        assert_eq!(summary.pass_rate, 0.5);
    }

    #[test]
    fn test_summary_of_empty_run() {
        let summary = RunSummary::from_cases(&[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.pass_rate, 0.0);
    }

    #[test]
    fn test_case_failure_from_error() {
        let err = NumevalError::ComputationBlocked {
            missing: vec!["Cost".to_string()],
        };
        let failure = CaseFailure::from(&err);
        assert_eq!(failure.kind, FailureKind::ComputationBlocked);
        assert!(failure.message.contains("Cost"));
    }
}
