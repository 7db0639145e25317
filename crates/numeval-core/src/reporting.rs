use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use crate::domain::{CaseReport, RunReport};

/// Version of the JSON run artifact layout.
pub const REPORT_SCHEMA_VERSION: &str = "1.0";

#[derive(Serialize)]
struct RunReportArtifact<'a> {
    schema_version: &'static str,
    #[serde(flatten)]
    report: &'a RunReport,
}

/// Write the run report as pretty JSON.
pub fn write_run_report_json(path: &Path, report: &RunReport) -> Result<()> {
    let artifact = RunReportArtifact {
        schema_version: REPORT_SCHEMA_VERSION,
        report,
    };
    let content = serde_json::to_string_pretty(&artifact).context("serialize run report")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

/// Render a Markdown summary of a run.
pub fn render_run_summary_md(report: &RunReport) -> String {
    let s = &report.summary;
    let mut out = String::new();
    out.push_str("# Run Summary\n\n");
    out.push_str(&format!(
        "- run: `{}`\n- suite digest: `{}`\n- formatting: {}\n- passed: {} / {} ({:.1}%)\n- failed: {}\n- errored: {}\n\n",
        report.run_id,
        report.suite_digest,
        report.formatting,
        s.passed,
        s.total,
        s.pass_rate * 100.0,
        s.failed,
        s.errored
    ));

    if report.cases.is_empty() {
        return out;
    }

    out.push_str("## Cases\n");
    out.push_str("| # | Function | Expected | Produced | Result |\n");
    out.push_str("|---|----------|----------|----------|--------|\n");
    for case in &report.cases {
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            case.index,
            cell(&case.function),
            cell(&case.expected),
            cell(case.produced_answer.as_deref().unwrap_or("-")),
            verdict(case)
        ));
    }
    out
}

/// Write the Markdown summary.
pub fn write_run_summary_md(path: &Path, report: &RunReport) -> Result<()> {
    let md = render_run_summary_md(report);
    std::fs::write(path, md).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

fn verdict(case: &CaseReport) -> String {
    match (&case.failure, case.passed) {
        (Some(failure), _) => format!("ERROR ({})", failure.kind),
        (None, true) => "PASSED".to_string(),
        (None, false) => "FAILED".to_string(),
    }
}

fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
