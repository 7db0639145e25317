//! In-memory fakes for the model and sandbox seams (testing only)
//!
//! Provides `ScriptedModel`, `FnModel`, and `ScriptedSandbox`, which satisfy
//! the trait contracts without network access or an interpreter.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::lm::{FieldValues, LanguageModel, LmError, Signature};
use crate::sandbox::{
    CodeSandbox, SandboxFailure, SandboxInvocation, SandboxOutput, SandboxResult,
};

// ---------------------------------------------------------------------------
// ScriptedModel
// ---------------------------------------------------------------------------

/// A call received by a fake model.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub signature: String,
    pub inputs: FieldValues,
}

/// Model that replays queued responses per signature name, in order.
///
/// A call with nothing queued for its signature fails with
/// [`LmError::InvalidResponse`].
#[derive(Debug, Default)]
pub struct ScriptedModel {
    queues: Mutex<HashMap<String, VecDeque<Result<FieldValues, LmError>>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response object for `signature`. Non-object values are
    /// queued as an empty object.
    pub fn with_response(self, signature: &str, response: Value) -> Self {
        self.push(signature, Ok(response.as_object().cloned().unwrap_or_default()));
        self
    }

    pub fn with_error(self, signature: &str, error: LmError) -> Self {
        self.push(signature, Err(error));
        self
    }

    pub fn push(&self, signature: &str, response: Result<FieldValues, LmError>) {
        self.queues
            .lock()
            .unwrap()
            .entry(signature.to_string())
            .or_default()
            .push_back(response);
    }

    /// All calls received so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls received for one signature.
    pub fn calls_for(&self, signature: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.signature == signature)
            .collect()
    }

    /// Responses still queued, across all signatures.
    pub fn remaining(&self) -> usize {
        self.queues.lock().unwrap().values().map(VecDeque::len).sum()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn predict(
        &self,
        signature: &Signature,
        inputs: &FieldValues,
    ) -> Result<FieldValues, LmError> {
        self.calls.lock().unwrap().push(RecordedCall {
            signature: signature.name.clone(),
            inputs: inputs.clone(),
        });
        self.queues
            .lock()
            .unwrap()
            .get_mut(&signature.name)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| {
                Err(LmError::InvalidResponse(format!(
                    "no scripted response for '{}'",
                    signature.name
                )))
            })
    }
}

// ---------------------------------------------------------------------------
// FnModel
// ---------------------------------------------------------------------------

type PredictFn =
    dyn Fn(&Signature, &FieldValues) -> BoxFuture<'static, Result<FieldValues, LmError>>
        + Send
        + Sync;

/// Model whose responses are computed from the inputs by a closure.
///
/// Useful when cases run concurrently and a shared queue would hand
/// responses to the wrong case.
pub struct FnModel {
    respond: Box<PredictFn>,
}

impl FnModel {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&Signature, &FieldValues) -> BoxFuture<'static, Result<FieldValues, LmError>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            respond: Box::new(respond),
        }
    }

    /// Build from a synchronous closure.
    pub fn answering<F>(respond: F) -> Self
    where
        F: Fn(&Signature, &FieldValues) -> Result<FieldValues, LmError> + Send + Sync + 'static,
    {
        Self::new(move |signature, inputs| {
            let result = respond(signature, inputs);
            Box::pin(async move { result })
        })
    }
}

impl std::fmt::Debug for FnModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnModel").finish_non_exhaustive()
    }
}

#[async_trait]
impl LanguageModel for FnModel {
    async fn predict(
        &self,
        signature: &Signature,
        inputs: &FieldValues,
    ) -> Result<FieldValues, LmError> {
        (self.respond)(signature, inputs).await
    }
}

// ---------------------------------------------------------------------------
// ScriptedSandbox
// ---------------------------------------------------------------------------

/// Sandbox that replays queued results and records every snippet it gets.
#[derive(Debug, Default)]
pub struct ScriptedSandbox {
    results: Mutex<VecDeque<SandboxResult<SandboxOutput>>>,
    invocations: Mutex<Vec<String>>,
}

impl ScriptedSandbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stdout(self, stdout: &str) -> Self {
        self.results
            .lock()
            .unwrap()
            .push_back(Ok(SandboxOutput::new(stdout)));
        self
    }

    pub fn with_failure(self, failure: SandboxFailure) -> Self {
        self.results.lock().unwrap().push_back(Err(failure));
        self
    }

    /// Snippets received so far, in order.
    pub fn invocations(&self) -> Vec<String> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl CodeSandbox for ScriptedSandbox {
    async fn run(&self, invocation: &SandboxInvocation) -> SandboxResult<SandboxOutput> {
        self.invocations
            .lock()
            .unwrap()
            .push(invocation.code.clone());
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SandboxFailure::runtime("no scripted sandbox result")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sig(name: &str) -> Signature {
        Signature::new(name, "test")
    }

    #[tokio::test]
    async fn scripted_model_replays_per_signature() {
        let model = ScriptedModel::new()
            .with_response("a", json!({"n": 1}))
            .with_response("b", json!({"n": 2}))
            .with_response("a", json!({"n": 3}));

        let inputs = FieldValues::new();
        assert_eq!(model.predict(&sig("a"), &inputs).await.unwrap()["n"], json!(1));
        assert_eq!(model.predict(&sig("a"), &inputs).await.unwrap()["n"], json!(3));
        assert_eq!(model.predict(&sig("b"), &inputs).await.unwrap()["n"], json!(2));
        assert!(model.predict(&sig("a"), &inputs).await.is_err());
        assert_eq!(model.calls_for("a").len(), 3);
        assert_eq!(model.remaining(), 0);
    }

    #[tokio::test]
    async fn fn_model_answers_from_inputs() {
        let model = FnModel::answering(|signature, inputs| {
            let mut out = inputs.clone();
            out.insert("sig".to_string(), json!(signature.name));
            Ok(out)
        });
        let inputs = json!({"x": 5}).as_object().cloned().unwrap();
        let out = model.predict(&sig("echo"), &inputs).await.unwrap();
        assert_eq!(out["x"], json!(5));
        assert_eq!(out["sig"], json!("echo"));
    }

    #[tokio::test]
    async fn scripted_sandbox_records_invocations() {
        let sandbox = ScriptedSandbox::new()
            .with_stdout("1\n")
            .with_failure(SandboxFailure::syntax("bad"));
        assert_eq!(
            sandbox
                .run(&SandboxInvocation::new("print(1)"))
                .await
                .unwrap()
                .stdout,
            "1\n"
        );
        assert!(sandbox.run(&SandboxInvocation::new("(")).await.is_err());
        assert!(sandbox.run(&SandboxInvocation::new("x")).await.is_err());
        assert_eq!(sandbox.invocations(), vec!["print(1)", "(", "x"]);
    }
}
