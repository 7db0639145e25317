//! Extraction agent.
//!
//! Program-of-thought: the model writes a snippet that pulls the target
//! values out of the text, the sandbox runs it, and the model reads the
//! output back into a keyword → number map. The agent then filters that map
//! so the result only ever holds target keys with real numbers that the text
//! actually mentions.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde_json::{json, Value};

use super::labels::{exact_label_value, mentions};
use super::{clean_code, fields};
use crate::domain::{ExtractionResult, NumevalError, Result};
use crate::formatting::parse_number;
use crate::lm::openai::strip_code_fence;
use crate::lm::{field_text, FieldValues, Predictor, Signature};
use crate::obs;
use crate::sandbox::{CodeSandbox, SandboxFailure, SandboxInvocation};

pub const GENERATE_CODE: &str = "generate_extraction_code";
pub const REGENERATE_CODE: &str = "regenerate_extraction_code";
pub const IDENTIFY_TARGETS: &str = "identify_targets";

const CODE_RULES: &str = "Write a self-contained Python snippet that finds the value of each \
target keyword in the input text and prints exactly one JSON object mapping each keyword it \
found to its number. Leave out keywords whose value does not appear in the text; never guess \
or use placeholders. Prefer the value labeled with exactly the keyword over values with wider \
labels. Use only the standard library (re and json are fine); numeric libraries are not \
available.";

pub fn generate_code_signature() -> Signature {
    Signature::new(GENERATE_CODE, CODE_RULES)
        .input("input_text", "raw text that may contain the values")
        .input("targets", "JSON array of keywords to locate")
        .optional_output("reasoning", "how the snippet locates each value")
        .output("code", "the Python snippet")
}

pub fn regenerate_code_signature() -> Signature {
    Signature::new(
        REGENERATE_CODE,
        format!("{CODE_RULES} The previous snippet failed; fix it using the error."),
    )
    .input("input_text", "raw text that may contain the values")
    .input("targets", "JSON array of keywords to locate")
    .input("previous_code", "the snippet that failed")
    .input("error", "how it failed")
    .optional_output("reasoning", "what was wrong and how it is fixed")
    .output("code", "the corrected Python snippet")
}

pub fn identify_targets_signature() -> Signature {
    Signature::new(
        IDENTIFY_TARGETS,
        "Read the output of the extraction snippet and report the value found for each target \
         keyword. Only report values that appear in the input text. Omit a keyword rather than \
         guessing when its value is absent.",
    )
    .input("input_text", "raw text that may contain the values")
    .input("targets", "JSON array of keywords to locate")
    .input("code", "the snippet that ran")
    .input("code_output", "what the snippet printed")
    .output("thought", "step-by-step reasoning")
    .optional_output("numbers", "JSON object mapping each found keyword to its number")
}

/// Locates target values in noisy text.
#[derive(Clone)]
pub struct ExtractionAgent {
    predictor: Predictor,
    sandbox: Arc<dyn CodeSandbox>,
    attempts: u32,
}

impl ExtractionAgent {
    pub fn new(predictor: Predictor, sandbox: Arc<dyn CodeSandbox>, attempts: u32) -> Self {
        Self {
            predictor,
            sandbox,
            attempts: attempts.max(1),
        }
    }

    pub async fn extract(
        &self,
        input_text: &str,
        targets: &BTreeSet<String>,
    ) -> Result<ExtractionResult> {
        let targets_json = json!(targets.iter().collect::<Vec<_>>());

        let mut code = self.generate(input_text, &targets_json).await?;
        let mut attempt = 1;
        let stdout = loop {
            match self.sandbox.run(&SandboxInvocation::new(code.clone())).await {
                Ok(output) => break output.stdout,
                Err(failure) if attempt >= self.attempts => {
                    return Err(NumevalError::ExtractionFailed {
                        attempts: attempt,
                        last_error: failure.to_string(),
                    });
                }
                Err(failure) => {
                    obs::emit_extraction_retry(attempt, &failure);
                    code = self
                        .regenerate(input_text, &targets_json, &code, &failure)
                        .await?;
                    attempt += 1;
                }
            }
        };

        let outputs = self
            .predictor
            .call(
                &identify_targets_signature(),
                &fields([
                    ("input_text", json!(input_text)),
                    ("targets", targets_json),
                    ("code", json!(code)),
                    ("code_output", json!(stdout)),
                ]),
            )
            .await?;

        let thought = field_text(&outputs, "thought").unwrap_or_default();
        let mut proposed = printed_numbers(&stdout);
        proposed.extend(reported_numbers(&outputs));

        let numbers = settle_numbers(input_text, targets, proposed);
        let result = ExtractionResult { thought, numbers };
        obs::emit_extraction_finished(result.numbers.len(), &result.missing_targets(targets));
        Ok(result)
    }

    async fn generate(&self, input_text: &str, targets: &Value) -> Result<String> {
        let outputs = self
            .predictor
            .call(
                &generate_code_signature(),
                &fields([
                    ("input_text", json!(input_text)),
                    ("targets", targets.clone()),
                ]),
            )
            .await?;
        Ok(clean_code(&field_text(&outputs, "code").unwrap_or_default()))
    }

    async fn regenerate(
        &self,
        input_text: &str,
        targets: &Value,
        previous_code: &str,
        failure: &SandboxFailure,
    ) -> Result<String> {
        let outputs = self
            .predictor
            .call(
                &regenerate_code_signature(),
                &fields([
                    ("input_text", json!(input_text)),
                    ("targets", targets.clone()),
                    ("previous_code", json!(previous_code)),
                    ("error", json!(failure.to_string())),
                ]),
            )
            .await?;
        Ok(clean_code(&field_text(&outputs, "code").unwrap_or_default()))
    }
}

impl std::fmt::Debug for ExtractionAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionAgent")
            .field("attempts", &self.attempts)
            .finish_non_exhaustive()
    }
}

/// The last line of `stdout` that is a JSON object.
fn printed_numbers(stdout: &str) -> Vec<(String, Value)> {
    stdout
        .lines()
        .rev()
        .find_map(|line| match serde_json::from_str::<Value>(line.trim()) {
            Ok(Value::Object(map)) => Some(map.into_iter().collect()),
            _ => None,
        })
        .unwrap_or_default()
}

/// The model's `numbers` field, given either as an object or as a JSON
/// string holding one.
fn reported_numbers(outputs: &FieldValues) -> Vec<(String, Value)> {
    match outputs.get("numbers") {
        Some(Value::Object(map)) => map.clone().into_iter().collect(),
        Some(Value::String(text)) => match serde_json::from_str::<Value>(strip_code_fence(text)) {
            Ok(Value::Object(map)) => map.into_iter().collect(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Apply the extraction post-conditions to proposed `(key, value)` pairs.
///
/// Later pairs win over earlier ones for the same target. After filtering,
/// a value written under exactly the target's label in the text overrides a
/// disagreeing proposal and fills a target nothing was proposed for.
pub fn settle_numbers(
    input_text: &str,
    targets: &BTreeSet<String>,
    proposed: Vec<(String, Value)>,
) -> BTreeMap<String, f64> {
    let mut numbers = BTreeMap::new();

    for (key, value) in proposed {
        let Some(target) = targets
            .iter()
            .find(|t| t.trim().eq_ignore_ascii_case(key.trim()))
        else {
            obs::emit_value_dropped(&key, "not a target");
            continue;
        };
        let Some(number) = numeric_value(&value) else {
            obs::emit_value_dropped(target, "not a number");
            numbers.remove(target);
            continue;
        };
        if !mentions(input_text, target) {
            obs::emit_value_dropped(target, "keyword not in text");
            continue;
        }
        numbers.insert(target.clone(), number);
    }

    for target in targets {
        if let Some(labeled) = exact_label_value(input_text, target) {
            if numbers.get(target) != Some(&labeled) {
                numbers.insert(target.clone(), labeled);
            }
        }
    }

    numbers
}

fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}
