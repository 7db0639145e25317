//! Suite files and layered configuration, read from disk.

use std::collections::HashMap;
use std::fs;

use numeval_cli::settings::{load_key_file, resolve_with, Overrides};
use numeval_cli::suite::load_suite;
use numeval_core::{Evaluator, FormattingVariant, MissingValuePolicy};

#[test]
fn loads_suite_file_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("math_tests.yaml");
    fs::write(
        &path,
        r#"
- input:
    input_text: "Revenue: 500, Cost: 200"
    targets: [Revenue, Cost]
    function: "Subtract Cost from Revenue"
    expected: "300"
- input:
    input_text: "Q1 sales were 1,200 and Q2 sales were 1,800"
    targets: "Q1, Q2"
    function: "Average of Q1 and Q2"
  expected: 1500.5
"#,
    )
    .unwrap();

    let cases = load_suite(&path).unwrap();
    assert_eq!(cases.len(), 2);
    assert_eq!(cases[0].function, "Subtract Cost from Revenue");
    assert_eq!(cases[1].expected, "1500.5");
    assert!(cases[1].targets.contains("Q2"));
}

#[test]
fn missing_suite_file_names_the_path() {
    let err = load_suite(std::path::Path::new("/nonexistent/suite.yaml")).unwrap_err();
    assert!(format!("{err:#}").contains("suite.yaml"), "{err:#}");
}

#[test]
fn flags_override_env_which_overrides_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("numeval.toml");
    fs::write(
        &path,
        r#"
formatting = "b"
concurrency = 2

[model]
model = "from-file"

[agent]
max_steps = 4
"#,
    )
    .unwrap();

    let env: HashMap<&str, &str> = [("NUMEVAL_MODEL", "from-env"), ("api_key", "sk-test")]
        .into_iter()
        .collect();
    let lookup = |name: &str| env.get(name).map(|v| v.to_string());

    let config = resolve_with(Some(&path), &Overrides::default(), lookup).unwrap();
    assert_eq!(config.formatting, FormattingVariant::B);
    assert_eq!(config.concurrency, 2);
    assert_eq!(config.agent.max_steps, 4);
    assert_eq!(config.model.model, "from-env");
    assert_eq!(config.model.api_key.as_deref(), Some("sk-test"));

    let overrides = Overrides {
        model: Some("from-flag".to_string()),
        exact: true,
        proceed_on_missing: true,
        ..Overrides::default()
    };
    let config = resolve_with(Some(&path), &overrides, lookup).unwrap();
    assert_eq!(config.model.model, "from-flag");
    assert_eq!(config.evaluator, Evaluator::ExactMatch);
    assert_eq!(config.missing_values, MissingValuePolicy::Proceed);
}

#[test]
fn invalid_config_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("numeval.toml");
    fs::write(&path, "[agent]\nmax_steps = 0\n").unwrap();

    let err = resolve_with(Some(&path), &Overrides::default(), |_| None).unwrap_err();
    assert!(format!("{err:#}").contains("max_steps"), "{err:#}");
}

#[test]
fn key_file_is_optional_and_loaded_when_present() {
    let dir = tempfile::tempdir().unwrap();
    assert!(!load_key_file(&dir.path().join("key.env")).unwrap());

    let path = dir.path().join("key.env");
    fs::write(&path, "NUMEVAL_CLI_TEST_KEY=abc123\n").unwrap();
    assert!(load_key_file(&path).unwrap());
    assert_eq!(std::env::var("NUMEVAL_CLI_TEST_KEY").as_deref(), Ok("abc123"));
}

fn demos_dir() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos")
}

#[test]
fn demo_suite_and_config_load() {
    let cases = load_suite(&demos_dir().join("math_tests.yaml")).unwrap();
    assert_eq!(cases.len(), 5);
    assert_eq!(cases[2].expected, "6.50");

    // The last case leaves a target without a value in the text.
    let blocked = &cases[4];
    assert!(blocked.targets.contains("gadgets"));
    assert!(!blocked.input_text.contains("gadgets:"));

    let config = resolve_with(
        Some(&demos_dir().join("numeval.toml")),
        &Overrides::default(),
        |_| None,
    )
    .unwrap();
    assert_eq!(config.missing_values, MissingValuePolicy::Block);
    assert_eq!(config.concurrency, 2);
}
