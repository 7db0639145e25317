//! YAML test-suite loading.
//!
//! A suite is a list of entries, each with an `input` mapping:
//!
//! ```yaml
//! - input:
//!     input_text: "Revenue: 500, Cost: 200"
//!     targets: [Revenue, Cost]
//!     function: "Subtract Cost from Revenue"
//!     expected: "300"
//! ```
//!
//! `expected` may also sit beside `input`, and `targets` may be a
//! comma-separated string. Quote expected answers such as `"6.50"`; an
//! unquoted YAML number loses its trailing zeros.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use numeval_core::TestCase;

#[derive(Debug, Deserialize)]
struct SuiteEntry {
    input: SuiteInput,
    #[serde(default)]
    expected: Option<Scalar>,
}

#[derive(Debug, Deserialize)]
struct SuiteInput {
    input_text: String,
    targets: Targets,
    function: String,
    #[serde(default)]
    expected: Option<Scalar>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Targets {
    List(Vec<String>),
    Text(String),
}

impl Targets {
    fn into_vec(self) -> Vec<String> {
        let raw = match self {
            Targets::List(items) => items,
            Targets::Text(text) => text.split(',').map(str::to_string).collect(),
        };
        raw.into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Text(s) => s,
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
        }
    }
}

/// Parse suite YAML into test cases, in file order.
pub fn parse_suite(text: &str) -> Result<Vec<TestCase>> {
    let entries: Vec<SuiteEntry> = serde_yaml::from_str(text).context("parse suite YAML")?;

    let mut cases = Vec::with_capacity(entries.len());
    for (i, entry) in entries.into_iter().enumerate() {
        let number = i + 1;
        let Some(expected) = entry.input.expected.or(entry.expected) else {
            bail!("suite entry {number}: missing `expected`");
        };
        let targets = entry.input.targets.into_vec();
        if targets.is_empty() {
            bail!("suite entry {number}: `targets` is empty");
        }
        cases.push(TestCase::new(
            entry.input.input_text,
            targets,
            entry.input.function,
            expected.into_string(),
        ));
    }
    Ok(cases)
}

/// Read and parse a suite file.
pub fn load_suite(path: &Path) -> Result<Vec<TestCase>> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("read suite {:?}", path))?;
    parse_suite(&text).with_context(|| format!("load suite {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_expected() {
        let cases = parse_suite(
            r#"
- input:
    input_text: "Revenue: 500, Cost: 200"
    targets: [Revenue, Cost]
    function: "Subtract Cost from Revenue"
    expected: "300"
"#,
        )
        .unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].expected, "300");
        assert!(cases[0].targets.contains("Revenue"));
        assert!(cases[0].targets.contains("Cost"));
    }

    #[test]
    fn test_parse_sibling_expected_and_string_targets() {
        let cases = parse_suite(
            r#"
- input:
    input_text: "a=10, b=3"
    targets: "a, b"
    function: "Average of a and b"
  expected: "6.50"
- input:
    input_text: "x: 4"
    targets: [x]
    function: "double x"
  expected: 8
"#,
        )
        .unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].expected, "6.50");
        assert_eq!(cases[0].targets.len(), 2);
        assert_eq!(cases[1].expected, "8");
    }

    #[test]
    fn test_missing_expected_names_entry() {
        let err = parse_suite(
            r#"
- input:
    input_text: "a: 1"
    targets: [a]
    function: "a"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("entry 1"), "{err}");
    }

    #[test]
    fn test_empty_targets_rejected() {
        let err = parse_suite(
            r#"
- input:
    input_text: "a: 1"
    targets: " , "
    function: "a"
    expected: "1"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("targets"), "{err}");
    }

    #[test]
    fn test_malformed_yaml_is_error() {
        assert!(parse_suite("- input: [unclosed").is_err());
    }
}
