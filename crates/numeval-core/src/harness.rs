//! Evaluation harness.
//!
//! Drives each test case through extraction, the missing-value policy,
//! computation, and evaluation, and collects one [`CaseReport`] per case in
//! input order. A case that errors is recorded and the run moves on.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::Instrument;
use uuid::Uuid;

use crate::agents::{ComputationAgent, ExtractionAgent};
use crate::config::{HarnessConfig, MissingValuePolicy};
use crate::domain::{
    suite_digest, CaseFailure, CaseReport, NumevalError, Result, RunReport, RunSummary, TestCase,
};
use crate::lm::{LanguageModel, Predictor};
use crate::metrics::METRICS;
use crate::obs;
use crate::sandbox::CodeSandbox;

pub struct Harness {
    config: Arc<HarnessConfig>,
    extraction: ExtractionAgent,
    computation: ComputationAgent,
}

impl Harness {
    /// Wire the agents. Fails on an invalid configuration, before any case
    /// runs.
    pub fn new(
        config: Arc<HarnessConfig>,
        model: Arc<dyn LanguageModel>,
        sandbox: Arc<dyn CodeSandbox>,
    ) -> Result<Self> {
        config.validate()?;

        let predictor = Predictor::new(model, config.model.request_timeout_ms);
        let extraction = ExtractionAgent::new(
            predictor.clone(),
            sandbox.clone(),
            config.agent.extraction_attempts,
        );
        let computation = ComputationAgent::new(
            predictor,
            sandbox,
            config.formatting_policy(),
            config.agent.max_steps,
        );

        Ok(Self {
            config,
            extraction,
            computation,
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run every case and report in input order.
    pub async fn run(&self, cases: &[TestCase]) -> RunReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let timer = Instant::now();
        let concurrency = self.config.concurrency.max(1);

        async {
            obs::emit_run_started(&run_id.to_string(), cases.len(), concurrency);

            let reports: Vec<CaseReport> = stream::iter(cases.iter().enumerate())
                .map(|(index, case)| {
                    self.run_case(index, case)
                        .instrument(obs::case_span(index))
                })
                .buffered(concurrency)
                .collect()
                .await;

            let summary = RunSummary::from_cases(&reports);
            obs::emit_run_finished(
                &run_id.to_string(),
                timer.elapsed().as_millis() as u64,
                summary.passed,
                summary.total,
            );
            METRICS.flush();

            RunReport {
                run_id,
                suite_digest: suite_digest(cases),
                formatting: self.config.formatting,
                started_at,
                finished_at: Utc::now(),
                summary,
                cases: reports,
            }
        }
        .instrument(obs::run_span(&run_id.to_string()))
        .await
    }

    /// Run one case. Never fails: errors end up in the report.
    pub async fn run_case(&self, index: usize, case: &TestCase) -> CaseReport {
        let timer = Instant::now();
        let mut report = CaseReport::pending(index, case);
        METRICS.inc_cases_run();

        if let Err(err) = self.drive(case, &mut report).await {
            obs::emit_case_failed(index, &err);
            METRICS.inc_cases_errored();
            report.failure = Some(CaseFailure::from(&err));
        }
        if report.passed {
            METRICS.inc_cases_passed();
        }

        report.duration_ms = timer.elapsed().as_millis() as u64;
        obs::emit_case_finished(index, report.passed, report.duration_ms);
        report
    }

    async fn drive(&self, case: &TestCase, report: &mut CaseReport) -> Result<()> {
        let extraction = self
            .extraction
            .extract(&case.input_text, &case.targets)
            .await?;
        let missing = extraction.missing_targets(&case.targets);
        let values = extraction.numbers.clone();
        report.missing_targets = missing.clone();
        report.extraction = Some(extraction);

        if !missing.is_empty() && self.config.missing_values == MissingValuePolicy::Block {
            return Err(NumevalError::ComputationBlocked { missing });
        }

        let computation = self
            .computation
            .compute(&values, &case.function, &missing)
            .await?;
        let outcome = self
            .config
            .evaluator
            .evaluate(&computation.answer, &case.expected);

        report.produced_answer = Some(computation.answer.clone());
        report.passed = outcome.passed;
        report.computation = Some(computation);
        Ok(())
    }
}

impl std::fmt::Debug for Harness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harness")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
