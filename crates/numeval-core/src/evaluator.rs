//! Answer evaluation.
//!
//! `ExactMatch` compares trimmed strings, so `"1000"` and `"1,000.00"` differ.
//! `NumericTolerance` (the default) parses both sides and compares the
//! numbers, falling back to string equality when either side is not numeric.

use serde::{Deserialize, Serialize};

use crate::domain::EvaluationOutcome;
use crate::formatting::parse_number;

/// Comparison mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Evaluator {
    ExactMatch,
    /// Relative tolerance, floored at an absolute `epsilon` near zero.
    NumericTolerance {
        #[serde(default = "default_epsilon")]
        epsilon: f64,
    },
}

fn default_epsilon() -> f64 {
    1e-6
}

impl Default for Evaluator {
    fn default() -> Self {
        Evaluator::NumericTolerance {
            epsilon: default_epsilon(),
        }
    }
}

impl Evaluator {
    pub fn evaluate(&self, answer: &str, expected: &str) -> EvaluationOutcome {
        let passed = match self {
            Evaluator::ExactMatch => answer.trim() == expected.trim(),
            Evaluator::NumericTolerance { epsilon } => {
                match (parse_number(answer), parse_number(expected)) {
                    (Some(a), Some(e)) => {
                        let scale = a.abs().max(e.abs()).max(1.0);
                        (a - e).abs() <= epsilon * scale
                    }
                    _ => answer.trim() == expected.trim(),
                }
            }
        };
        EvaluationOutcome { passed }
    }
}

/// Evaluate with the default numeric-tolerant comparison.
pub fn evaluate(answer: &str, expected: &str) -> bool {
    Evaluator::default().evaluate(answer, expected).passed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_tolerance_ignores_formatting() {
        assert!(evaluate("1,000.00", "1000"));
        assert!(evaluate("1000", "1000.00"));
        assert!(evaluate("12.50%", "12.5"));
        assert!(evaluate(" 300 ", "300"));
    }

    #[test]
    fn test_numeric_tolerance_rejects_different_values() {
        assert!(!evaluate("300", "301"));
        assert!(!evaluate("6.5", "6.51"));
        assert!(!evaluate("-5", "5"));
    }

    #[test]
    fn test_relative_epsilon_scales_with_magnitude() {
        let eval = Evaluator::NumericTolerance { epsilon: 1e-6 };
        assert!(eval.evaluate("1000000000.0001", "1000000000").passed);
        assert!(!eval.evaluate("0.0001", "0").passed);
    }

    #[test]
    fn test_falls_back_to_string_equality_for_non_numeric() {
        assert!(evaluate("N/A", "N/A"));
        assert!(!evaluate("N/A", "n/a"));
        assert!(!evaluate("300", "three hundred"));
    }

    #[test]
    fn test_exact_match_is_format_sensitive() {
        let eval = Evaluator::ExactMatch;
        assert!(eval.evaluate("1,000", "1,000").passed);
        assert!(!eval.evaluate("1000", "1,000.00").passed);
    }

    #[test]
    fn test_evaluator_serde_tagged() {
        let json = serde_json::to_value(Evaluator::default()).unwrap();
        assert_eq!(json["mode"], "numeric_tolerance");
        let back: Evaluator = serde_json::from_str(r#"{"mode":"exact_match"}"#).unwrap();
        assert_eq!(back, Evaluator::ExactMatch);
    }
}
