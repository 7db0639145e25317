//! Structured observability hooks for evaluation runs.
//!
//! Spans for a run and for each case are created here and attached to the
//! corresponding futures with [`tracing::Instrument`], so events emitted by
//! the agents carry `run_id` and `case` fields.
//!
//! Events are emitted at `info!` level unless noted (filter with
//! `NUMEVAL_LOG`).

use tracing::{debug, info, warn, Span};

/// Span covering one harness run.
pub fn run_span(run_id: &str) -> Span {
    tracing::info_span!("numeval.run", run_id = %run_id)
}

/// Span covering one test case.
pub fn case_span(index: usize) -> Span {
    tracing::info_span!("numeval.case", case = index)
}

pub fn emit_run_started(run_id: &str, total_cases: usize, concurrency: usize) {
    info!(
        event = "run.started",
        run_id = %run_id,
        total_cases = total_cases,
        concurrency = concurrency,
    );
}

pub fn emit_run_finished(run_id: &str, duration_ms: u64, passed: usize, total: usize) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        passed = passed,
        total = total,
    );
}

pub fn emit_case_finished(index: usize, passed: bool, duration_ms: u64) {
    info!(
        event = "case.finished",
        case = index,
        passed = passed,
        duration_ms = duration_ms,
    );
}

/// Case stopped before evaluation (warning level).
pub fn emit_case_failed(index: usize, error: &dyn std::fmt::Display) {
    warn!(event = "case.failed", case = index, error = %error);
}

pub fn emit_extraction_finished(found: usize, missing: &[String]) {
    info!(
        event = "extraction.finished",
        found = found,
        missing = %missing.join(","),
    );
}

/// Extraction code failed and will be regenerated.
pub fn emit_extraction_retry(attempt: u32, error: &dyn std::fmt::Display) {
    debug!(event = "extraction.retry", attempt = attempt, error = %error);
}

/// A value proposed by the model was discarded by a post-condition.
pub fn emit_value_dropped(target: &str, reason: &str) {
    debug!(event = "extraction.value_dropped", target = %target, reason = %reason);
}

pub fn emit_reasoning_step(step: u32, action: &str) {
    debug!(event = "computation.step", step = step, action = %action);
}

pub fn emit_computation_finished(steps: u32, answer: &str) {
    info!(event = "computation.finished", steps = steps, answer = %answer);
}

pub fn emit_model_call(signature: &str, duration_ms: u64, ok: bool) {
    debug!(
        event = "model.call",
        signature = %signature,
        duration_ms = duration_ms,
        ok = ok,
    );
}
