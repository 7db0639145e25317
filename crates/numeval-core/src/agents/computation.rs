//! Computation agent.
//!
//! An explicit reason/act state machine:
//!
//! ```text
//! Reasoning ──run_code──▶ ToolCall ──observation──▶ Reasoning
//!     │
//!     ├──finish──▶ Finalized
//!     └──step ceiling reached──▶ Aborted
//! ```
//!
//! Every Reasoning step is one model call and counts against `max_steps`.
//! Sandbox failures come back as observations; only the step ceiling or a
//! model error ends the loop without an answer.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{clean_code, fields};
use crate::domain::{ComputationResult, NumevalError, Result};
use crate::formatting::{FormattingPolicy, ResultKind};
use crate::lm::{field_text, Predictor, Signature};
use crate::metrics::METRICS;
use crate::obs;
use crate::sandbox::{CodeSandbox, SandboxInvocation};

pub const PERFORM_FUNCTION_STEP: &str = "perform_function_step";

pub const ACTION_RUN_CODE: &str = "run_code";
pub const ACTION_FINISH: &str = "finish";

pub fn perform_function_signature() -> Signature {
    Signature::new(
        PERFORM_FUNCTION_STEP,
        "Compute the requested function over the given values, one step at a time. \
         To run code, set next_action to \"run_code\" and put a Python snippet that prints \
         its result in `code`. Write the arithmetic out yourself: numpy, pandas and other \
         numeric libraries are not available. When you know the result, set next_action to \
         \"finish\" and put the final answer in `answer`, following the formatting rules. \
         If a value the function needs is listed as unavailable, say so instead of inventing it.",
    )
    .input("values", "JSON object of keyword to number")
    .input("function", "the computation to perform")
    .input("unavailable_values", "JSON array of keywords whose value could not be found")
    .input("format_rules", "how the final answer must be written")
    .input("trajectory", "previous steps with their observations")
    .output("next_thought", "reasoning for this step")
    .output("next_action", "\"run_code\" or \"finish\"")
    .optional_output("code", "Python snippet to run when next_action is run_code")
    .optional_output("answer", "final answer when next_action is finish")
}

/// Position of the reason/act loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopState {
    Reasoning,
    ToolCall { code: String },
    Finalized { answer: String },
    Aborted { steps: u32 },
}

/// One completed step as shown back to the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrajectoryStep {
    pub step: u32,
    pub thought: String,
    pub action: String,
    pub code: Option<String>,
    pub observation: String,
}

/// Renders the trajectory as the text the model reads.
pub fn render_trajectory(steps: &[TrajectoryStep]) -> String {
    if steps.is_empty() {
        return "(no steps yet)".to_string();
    }
    let mut out = String::new();
    for step in steps {
        out.push_str(&format!("[step {}]\nthought: {}\naction: {}\n", step.step, step.thought, step.action));
        if let Some(code) = &step.code {
            out.push_str(&format!("code:\n{code}\n"));
        }
        out.push_str(&format!("observation: {}\n\n", step.observation));
    }
    out.trim_end().to_string()
}

/// Computes a function over extracted values.
#[derive(Clone)]
pub struct ComputationAgent {
    predictor: Predictor,
    sandbox: Arc<dyn CodeSandbox>,
    formatting: FormattingPolicy,
    max_steps: u32,
}

impl ComputationAgent {
    pub fn new(
        predictor: Predictor,
        sandbox: Arc<dyn CodeSandbox>,
        formatting: FormattingPolicy,
        max_steps: u32,
    ) -> Self {
        Self {
            predictor,
            sandbox,
            formatting,
            max_steps,
        }
    }

    /// Run the loop to a final answer.
    ///
    /// `unavailable` lists targets extraction could not find; it is passed to
    /// the model as-is and never filled in.
    pub async fn compute(
        &self,
        values: &BTreeMap<String, f64>,
        function: &str,
        unavailable: &[String],
    ) -> Result<ComputationResult> {
        let kind = ResultKind::classify(function);
        let mut trajectory: Vec<TrajectoryStep> = Vec::new();
        let mut thoughts: Vec<String> = Vec::new();
        let mut steps = 0u32;
        let mut state = LoopState::Reasoning;

        loop {
            state = match state {
                LoopState::Reasoning if steps >= self.max_steps => LoopState::Aborted { steps },
                LoopState::Reasoning => {
                    steps += 1;
                    METRICS.inc_reasoning_steps();
                    let outputs = self
                        .predictor
                        .call(
                            &perform_function_signature(),
                            &fields([
                                ("values", json!(values)),
                                ("function", json!(function)),
                                ("unavailable_values", json!(unavailable)),
                                ("format_rules", json!(self.formatting.instructions())),
                                ("trajectory", json!(render_trajectory(&trajectory))),
                            ]),
                        )
                        .await?;

                    let thought = field_text(&outputs, "next_thought").unwrap_or_default();
                    let action = field_text(&outputs, "next_action")
                        .unwrap_or_default()
                        .trim()
                        .to_ascii_lowercase();
                    obs::emit_reasoning_step(steps, &action);
                    thoughts.push(thought.clone());

                    let mut record = TrajectoryStep {
                        step: steps,
                        thought,
                        action: action.clone(),
                        code: None,
                        observation: String::new(),
                    };
                    let next = match action.as_str() {
                        ACTION_RUN_CODE => {
                            let code = field_text(&outputs, "code")
                                .map(|c| clean_code(&c))
                                .filter(|c| !c.is_empty());
                            match code {
                                Some(code) => {
                                    record.code = Some(code.clone());
                                    LoopState::ToolCall { code }
                                }
                                None => {
                                    record.observation =
                                        "run_code needs a non-empty `code` field".to_string();
                                    LoopState::Reasoning
                                }
                            }
                        }
                        ACTION_FINISH => {
                            let answer = field_text(&outputs, "answer")
                                .map(|a| a.trim().to_string())
                                .filter(|a| !a.is_empty());
                            match answer {
                                Some(answer) => LoopState::Finalized { answer },
                                None => {
                                    record.observation =
                                        "finish needs a non-empty `answer` field".to_string();
                                    LoopState::Reasoning
                                }
                            }
                        }
                        other => {
                            record.observation = format!(
                                "unknown action '{other}'; use \"{ACTION_RUN_CODE}\" or \"{ACTION_FINISH}\""
                            );
                            LoopState::Reasoning
                        }
                    };
                    trajectory.push(record);
                    next
                }
                LoopState::ToolCall { code } => {
                    let observation = match self.sandbox.run(&SandboxInvocation::new(code)).await {
                        Ok(output) if output.stdout.trim().is_empty() => {
                            "(no output; print the result)".to_string()
                        }
                        Ok(output) => output.stdout.trim().to_string(),
                        Err(failure) => format!("error: {failure}"),
                    };
                    if let Some(last) = trajectory.last_mut() {
                        last.observation = observation;
                    }
                    LoopState::Reasoning
                }
                LoopState::Finalized { answer } => {
                    let answer = self
                        .formatting
                        .normalize(&answer, kind)
                        .unwrap_or(answer);
                    obs::emit_computation_finished(steps, &answer);
                    return Ok(ComputationResult {
                        thought: thoughts.join("\n"),
                        answer,
                        steps,
                    });
                }
                LoopState::Aborted { steps } => {
                    return Err(NumevalError::ComputationIncomplete { steps });
                }
            };
        }
    }
}

impl std::fmt::Debug for ComputationAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputationAgent")
            .field("formatting", &self.formatting)
            .field("max_steps", &self.max_steps)
            .finish_non_exhaustive()
    }
}
