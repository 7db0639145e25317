//! numeval - numeric extraction and computation harness
//!
//! ## Commands
//!
//! - `run`: run a YAML suite through the extraction and computation agents
//! - `check-config`: resolve and print the effective configuration
//! - `check-suite`: parse a suite file and list its cases

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, Level};

use numeval_cli::console::{render_case, render_summary};
use numeval_cli::settings::{self, Overrides};
use numeval_cli::suite::load_suite;
use numeval_core::{
    suite_digest, write_run_report_json, write_run_summary_md, FormattingVariant, Harness,
    OpenAiChatModel, ProcessSandbox,
};

#[derive(Parser)]
#[command(name = "numeval")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Numeric extraction and computation harness", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConfigArgs {
    /// TOML configuration file
    #[arg(short, long, env = "NUMEVAL_CONFIG")]
    config: Option<PathBuf>,

    /// KEY=value file loaded into the environment when present
    #[arg(long, default_value = "key.env")]
    key_file: PathBuf,

    /// Answer formatting variant (a or b)
    #[arg(long)]
    variant: Option<FormattingVariant>,

    /// Cases in flight at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// Reasoning steps allowed per computation
    #[arg(long)]
    max_steps: Option<u32>,

    /// Model name
    #[arg(long)]
    model: Option<String>,

    /// Compare answers by exact string match
    #[arg(long)]
    exact: bool,

    /// Compute even when some targets were not extracted
    #[arg(long)]
    proceed_on_missing: bool,
}

impl ConfigArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            formatting: self.variant,
            concurrency: self.concurrency,
            max_steps: self.max_steps,
            model: self.model.clone(),
            exact: self.exact,
            proceed_on_missing: self.proceed_on_missing,
        }
    }

    fn resolve(&self) -> Result<numeval_core::HarnessConfig> {
        settings::load_key_file(&self.key_file)?;
        settings::resolve(self.config.as_deref(), &self.overrides())
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a suite and report pass/fail per case
    Run {
        /// YAML suite file
        #[arg(short, long, default_value = "math_tests.yaml")]
        suite: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,

        /// Write the full run report as JSON
        #[arg(long)]
        report_json: Option<PathBuf>,

        /// Write a Markdown summary
        #[arg(long)]
        report_md: Option<PathBuf>,

        /// Exit non-zero unless every case passed
        #[arg(long)]
        strict: bool,
    },

    /// Resolve configuration and print it (the API key is never printed)
    CheckConfig {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Parse a suite file and list its cases
    CheckSuite {
        /// YAML suite file
        #[arg(default_value = "math_tests.yaml")]
        suite: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    numeval_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Run {
            suite,
            config,
            report_json,
            report_md,
            strict,
        } => {
            cmd_run(
                &suite,
                &config,
                report_json.as_deref(),
                report_md.as_deref(),
                strict,
            )
            .await
        }
        Commands::CheckConfig { config } => cmd_check_config(&config),
        Commands::CheckSuite { suite } => cmd_check_suite(&suite),
    }
}

async fn cmd_run(
    suite: &Path,
    args: &ConfigArgs,
    report_json: Option<&Path>,
    report_md: Option<&Path>,
    strict: bool,
) -> Result<()> {
    let cases = load_suite(suite)?;
    let config = args.resolve()?;
    info!(
        suite = %suite.display(),
        cases = cases.len(),
        formatting = %config.formatting,
        model = %config.model.model,
        "starting run"
    );

    let model = OpenAiChatModel::new(&config.model).context("build model client")?;
    let sandbox = ProcessSandbox::new(config.sandbox.clone());
    let harness = Harness::new(Arc::new(config), Arc::new(model), Arc::new(sandbox))
        .context("build harness")?;

    let report = harness.run(&cases).await;

    for case in &report.cases {
        print!("{}", render_case(case));
    }
    println!("{}", render_summary(&report));

    if let Some(path) = report_json {
        write_run_report_json(path, &report)
            .with_context(|| format!("write report {:?}", path))?;
        println!("Report written to {}", path.display());
    }
    if let Some(path) = report_md {
        write_run_summary_md(path, &report)
            .with_context(|| format!("write summary {:?}", path))?;
        println!("Summary written to {}", path.display());
    }

    if strict && !report.all_passed() {
        bail!(
            "{} of {} cases did not pass",
            report.summary.total - report.summary.passed,
            report.summary.total
        );
    }
    Ok(())
}

fn cmd_check_config(args: &ConfigArgs) -> Result<()> {
    let config = args.resolve()?;
    OpenAiChatModel::new(&config.model).context("build model client")?;
    let text = serde_json::to_string_pretty(&config).context("serialize config")?;
    println!("{text}");
    println!("Configuration OK");
    Ok(())
}

fn cmd_check_suite(suite: &Path) -> Result<()> {
    let cases = load_suite(suite)?;
    println!("Suite: {}", suite.display());
    println!("Digest: {}", suite_digest(&cases));
    for (i, case) in cases.iter().enumerate() {
        println!(
            "  {:>3}. [{}] {} => {}",
            i + 1,
            case.targets.iter().cloned().collect::<Vec<_>>().join(", "),
            case.function,
            case.expected
        );
    }
    println!("{} cases", cases.len());
    Ok(())
}
