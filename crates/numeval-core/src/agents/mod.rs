//! Agents that drive the language model through a case.
//!
//! - [`extraction`]: program-of-thought value extraction
//! - [`computation`]: reason/act loop that computes the requested function
//! - [`labels`]: literal `Label: value` scanning used to check extraction

pub mod computation;
pub mod extraction;
pub mod labels;

use serde_json::Value;

use crate::lm::openai::strip_code_fence;
use crate::lm::FieldValues;

pub use computation::{ComputationAgent, LoopState};
pub use extraction::ExtractionAgent;

/// Build call inputs from `(name, value)` pairs.
pub(crate) fn fields<const N: usize>(pairs: [(&str, Value); N]) -> FieldValues {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

/// Model-written code with any Markdown fence removed.
pub(crate) fn clean_code(text: &str) -> String {
    strip_code_fence(text).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_code_strips_language_fence() {
        assert_eq!(clean_code("```python\nprint(1)\n```"), "print(1)");
        assert_eq!(clean_code("  print(2)\n"), "print(2)");
    }
}
