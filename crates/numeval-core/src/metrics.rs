//! Global atomic counters for numeval runs.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (the harness does so at the end of a run).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters.
pub struct Metrics {
    cases_run: AtomicU64,
    cases_passed: AtomicU64,
    cases_errored: AtomicU64,
    sandbox_invocations: AtomicU64,
    sandbox_failures: AtomicU64,
    model_calls: AtomicU64,
    reasoning_steps: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! counter {
    ($inc:ident, $get:ident, $field:ident) => {
        pub fn $inc(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(metric = stringify!($field), "counter incremented");
        }

        pub fn $get(&self) -> u64 {
            self.$field.load(Ordering::Relaxed)
        }
    };
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            cases_run: AtomicU64::new(0),
            cases_passed: AtomicU64::new(0),
            cases_errored: AtomicU64::new(0),
            sandbox_invocations: AtomicU64::new(0),
            sandbox_failures: AtomicU64::new(0),
            model_calls: AtomicU64::new(0),
            reasoning_steps: AtomicU64::new(0),
        }
    }

    counter!(inc_cases_run, cases_run, cases_run);
    counter!(inc_cases_passed, cases_passed, cases_passed);
    counter!(inc_cases_errored, cases_errored, cases_errored);
    counter!(inc_sandbox_invocations, sandbox_invocations, sandbox_invocations);
    counter!(inc_sandbox_failures, sandbox_failures, sandbox_failures);
    counter!(inc_model_calls, model_calls, model_calls);
    counter!(inc_reasoning_steps, reasoning_steps, reasoning_steps);

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            cases_run = self.cases_run(),
            cases_passed = self.cases_passed(),
            cases_errored = self.cases_errored(),
            sandbox_invocations = self.sandbox_invocations(),
            sandbox_failures = self.sandbox_failures(),
            model_calls = self.model_calls(),
            reasoning_steps = self.reasoning_steps(),
        );
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        for counter in [
            &self.cases_run,
            &self.cases_passed,
            &self.cases_errored,
            &self.sandbox_invocations,
            &self.sandbox_failures,
            &self.model_calls,
            &self.reasoning_steps,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
