//! Human-readable run output.

use numeval_core::{CaseReport, RunReport};

/// Block printed for one case.
pub fn render_case(case: &CaseReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("\nExample {}:\n", case.index + 1));
    out.push_str(&format!("Input: {}\n", case.input_text));
    out.push_str(&format!(
        "Targets: {}\n",
        case.targets.iter().cloned().collect::<Vec<_>>().join(", ")
    ));
    out.push_str(&format!("Function: {}\n", case.function));
    out.push_str(&format!("Expected: {}\n", case.expected));
    if !case.missing_targets.is_empty() {
        out.push_str(&format!("Missing: {}\n", case.missing_targets.join(", ")));
    }
    match (&case.produced_answer, &case.failure) {
        (_, Some(failure)) => {
            out.push_str(&format!("Error: {}\n", failure.message));
            out.push_str("ERROR\n");
        }
        (Some(answer), None) => {
            out.push_str(&format!("Result: {answer}\n"));
            out.push_str(if case.passed { "PASSED\n" } else { "FAILED\n" });
        }
        (None, None) => out.push_str("FAILED\n"),
    }
    out
}

/// One-line totals.
pub fn render_summary(report: &RunReport) -> String {
    let s = &report.summary;
    format!(
        "\nPassed {}/{} ({:.1}%), failed {}, errored {}",
        s.passed,
        s.total,
        s.pass_rate * 100.0,
        s.failed,
        s.errored
    )
}
