//! Run configuration.
//!
//! Built once, before any case runs, from an optional TOML file plus
//! environment overrides, then shared read-only behind an `Arc`.
//!
//! ```toml
//! formatting = "b"
//! concurrency = 4
//!
//! [model]
//! model = "gpt-4.1-nano"
//! request_timeout_ms = 30000
//!
//! [sandbox]
//! timeout_ms = 5000
//!
//! [agent]
//! max_steps = 8
//!
//! [evaluator]
//! mode = "exact_match"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{NumevalError, Result};
use crate::evaluator::Evaluator;
use crate::formatting::{FormattingPolicy, FormattingVariant};
use crate::sandbox::SandboxConfig;

/// Environment variables consulted for the API key, in priority order.
/// `api_key` is the name used in `key.env` files.
pub const API_KEY_ENV: &[&str] = &["NUMEVAL_API_KEY", "OPENAI_API_KEY", "api_key"];
pub const MODEL_ENV: &str = "NUMEVAL_MODEL";
pub const BASE_URL_ENV: &str = "NUMEVAL_BASE_URL";

/// Language model endpoint and call limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    pub base_url: String,
    pub model: String,
    /// Never written back out.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    pub request_timeout_ms: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4.1-nano".to_string(),
            api_key: None,
            max_tokens: 1000,
            temperature: None,
            request_timeout_ms: 60_000,
        }
    }
}

/// Agent loop limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    /// Reasoning steps allowed per computation.
    pub max_steps: u32,
    /// Extraction code generations allowed per case (first try included).
    pub extraction_attempts: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: 6,
            extraction_attempts: 3,
        }
    }
}

/// What to do when extraction leaves targets without a value.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MissingValuePolicy {
    /// Fail the case with `ComputationBlocked` before computing.
    #[default]
    Block,
    /// Compute anyway; the model is told which values are unavailable.
    Proceed,
}

/// Everything a run needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HarnessConfig {
    pub formatting: FormattingVariant,
    pub missing_values: MissingValuePolicy,
    /// Cases in flight at once; 1 runs the suite sequentially.
    pub concurrency: usize,
    pub model: ModelConfig,
    pub sandbox: SandboxConfig,
    pub agent: AgentConfig,
    pub evaluator: Evaluator,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            formatting: FormattingVariant::default(),
            missing_values: MissingValuePolicy::default(),
            concurrency: 1,
            model: ModelConfig::default(),
            sandbox: SandboxConfig::default(),
            agent: AgentConfig::default(),
            evaluator: Evaluator::default(),
        }
    }
}

impl HarnessConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| NumevalError::Configuration(format!("invalid TOML: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            NumevalError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Apply overrides from an environment lookup.
    ///
    /// The API key is taken from the first of [`API_KEY_ENV`] that is set and
    /// non-empty, replacing any key already present.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = API_KEY_ENV.iter().find_map(|name| non_empty(name)) {
            self.model.api_key = Some(key);
        }
        if let Some(model) = non_empty(MODEL_ENV) {
            self.model.model = model;
        }
        if let Some(url) = non_empty(BASE_URL_ENV) {
            self.model.base_url = url;
        }
        self
    }

    /// Overrides from the process environment.
    pub fn with_process_env(self) -> Self {
        self.with_env_overrides(|name| std::env::var(name).ok())
    }

    /// Reject settings no run could succeed with.
    pub fn validate(&self) -> Result<()> {
        let checks: [(bool, &str); 6] = [
            (self.agent.max_steps == 0, "agent.max_steps must be at least 1"),
            (
                self.agent.extraction_attempts == 0,
                "agent.extraction_attempts must be at least 1",
            ),
            (self.sandbox.timeout_ms == 0, "sandbox.timeout_ms must be positive"),
            (
                self.model.request_timeout_ms == 0,
                "model.request_timeout_ms must be positive",
            ),
            (self.concurrency == 0, "concurrency must be at least 1"),
            (
                self.sandbox.interpreter.trim().is_empty(),
                "sandbox.interpreter must not be empty",
            ),
        ];
        match checks.iter().find(|(failed, _)| *failed) {
            Some((_, message)) => Err(NumevalError::Configuration((*message).to_string())),
            None => Ok(()),
        }
    }

    pub fn formatting_policy(&self) -> FormattingPolicy {
        FormattingPolicy::new(self.formatting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let cfg = HarnessConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.model.model, "gpt-4.1-nano");
        assert_eq!(cfg.model.max_tokens, 1000);
        assert_eq!(cfg.agent.max_steps, 6);
        assert_eq!(cfg.concurrency, 1);
        assert_eq!(cfg.missing_values, MissingValuePolicy::Block);
        assert_eq!(cfg.formatting, FormattingVariant::A);
    }

    #[test]
    fn test_toml_partial_override() {
        let cfg = HarnessConfig::from_toml_str(
            r#"
formatting = "b"
concurrency = 4
missing_values = "proceed"

[agent]
max_steps = 9

[evaluator]
mode = "exact_match"

[sandbox]
timeout_ms = 2500
"#,
        )
        .unwrap();
        assert_eq!(cfg.formatting, FormattingVariant::B);
        assert_eq!(cfg.concurrency, 4);
        assert_eq!(cfg.missing_values, MissingValuePolicy::Proceed);
        assert_eq!(cfg.agent.max_steps, 9);
        assert_eq!(cfg.agent.extraction_attempts, 3);
        assert_eq!(cfg.evaluator, Evaluator::ExactMatch);
        assert_eq!(cfg.sandbox.timeout_ms, 2500);
        assert_eq!(cfg.sandbox.interpreter, "python3");
    }

    #[test]
    fn test_tolerance_epsilon_defaults_when_omitted() {
        let cfg = HarnessConfig::from_toml_str("[evaluator]\nmode = \"numeric_tolerance\"\n")
            .unwrap();
        assert_eq!(cfg.evaluator, Evaluator::default());
    }

    #[test]
    fn test_invalid_toml_is_configuration_error() {
        let err = HarnessConfig::from_toml_str("concurrency = \"many\"").unwrap_err();
        assert!(matches!(err, NumevalError::Configuration(_)));
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut cfg = HarnessConfig::default();
        cfg.agent.max_steps = 0;
        assert!(cfg.validate().unwrap_err().to_string().contains("max_steps"));

        let mut cfg = HarnessConfig::default();
        cfg.sandbox.timeout_ms = 0;
        assert!(cfg.validate().unwrap_err().to_string().contains("timeout_ms"));

        let mut cfg = HarnessConfig::default();
        cfg.concurrency = 0;
        assert!(cfg.validate().unwrap_err().to_string().contains("concurrency"));
    }

    #[test]
    fn test_env_overrides_key_priority() {
        let cfg = HarnessConfig::default().with_env_overrides(env(&[
            ("api_key", "from-key-file"),
            ("OPENAI_API_KEY", "from-openai"),
        ]));
        assert_eq!(cfg.model.api_key.as_deref(), Some("from-openai"));

        let cfg = HarnessConfig::default().with_env_overrides(env(&[
            ("NUMEVAL_API_KEY", "  "),
            ("api_key", "from-key-file"),
            ("NUMEVAL_MODEL", "gpt-4o-mini"),
        ]));
        assert_eq!(cfg.model.api_key.as_deref(), Some("from-key-file"));
        assert_eq!(cfg.model.model, "gpt-4o-mini");
    }

    #[test]
    fn test_api_key_never_serialized() {
        let mut cfg = HarnessConfig::default();
        cfg.model.api_key = Some("sk-secret".to_string());
        let text = toml::to_string(&cfg).unwrap();
        assert!(!text.contains("sk-secret"));
    }
}
