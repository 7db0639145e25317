//! Resolve the run configuration from file, environment, and flags.
//!
//! Later sources win: TOML file, then environment, then command-line
//! overrides. The result is validated before anything runs.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use numeval_core::{Evaluator, FormattingVariant, HarnessConfig, MissingValuePolicy};

/// Values given on the command line. `None` leaves the lower layer alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub formatting: Option<FormattingVariant>,
    pub concurrency: Option<usize>,
    pub max_steps: Option<u32>,
    pub model: Option<String>,
    pub exact: bool,
    pub proceed_on_missing: bool,
}

impl Overrides {
    pub fn apply(&self, mut config: HarnessConfig) -> HarnessConfig {
        if let Some(variant) = self.formatting {
            config.formatting = variant;
        }
        if let Some(n) = self.concurrency {
            config.concurrency = n;
        }
        if let Some(steps) = self.max_steps {
            config.agent.max_steps = steps;
        }
        if let Some(model) = &self.model {
            config.model.model = model.clone();
        }
        if self.exact {
            config.evaluator = Evaluator::ExactMatch;
        }
        if self.proceed_on_missing {
            config.missing_values = MissingValuePolicy::Proceed;
        }
        config
    }
}

/// Load `KEY=value` lines from `path` into the process environment when the
/// file exists. Variables already set are left as they are.
pub fn load_key_file(path: &Path) -> Result<bool> {
    if !path.exists() {
        debug!(path = %path.display(), "no key file");
        return Ok(false);
    }
    dotenvy::from_path(path).with_context(|| format!("load key file {:?}", path))?;
    Ok(true)
}

/// Build the validated configuration, reading the environment via `lookup`.
pub fn resolve_with<F>(
    config_path: Option<&Path>,
    overrides: &Overrides,
    lookup: F,
) -> Result<HarnessConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let base = match config_path {
        Some(path) => HarnessConfig::load(path)
            .with_context(|| format!("load config {:?}", path))?,
        None => HarnessConfig::default(),
    };
    let config = overrides.apply(base.with_env_overrides(lookup));
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// [`resolve_with`] against the process environment.
pub fn resolve(config_path: Option<&Path>, overrides: &Overrides) -> Result<HarnessConfig> {
    resolve_with(config_path, overrides, |name| std::env::var(name).ok())
}
