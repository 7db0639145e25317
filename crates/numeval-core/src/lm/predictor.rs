//! Validated, time-bounded model calls.

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::error::LmError;
use super::signature::{FieldValues, Signature};
use super::LanguageModel;
use crate::metrics::METRICS;
use crate::obs;

/// Wraps a [`LanguageModel`] so every call checks the signature's inputs
/// before sending, checks its required outputs on return, and is cut off
/// after the configured timeout.
#[derive(Clone)]
pub struct Predictor {
    model: Arc<dyn LanguageModel>,
    timeout_ms: u64,
}

impl Predictor {
    pub fn new(model: Arc<dyn LanguageModel>, timeout_ms: u64) -> Self {
        Self { model, timeout_ms }
    }

    pub async fn call(
        &self,
        signature: &Signature,
        inputs: &FieldValues,
    ) -> Result<FieldValues, LmError> {
        signature.check_inputs(inputs)?;

        METRICS.inc_model_calls();
        let started = Instant::now();
        let limit = Duration::from_millis(self.timeout_ms);
        let result = match tokio::time::timeout(limit, self.model.predict(signature, inputs)).await
        {
            Ok(result) => result,
            Err(_) => Err(LmError::Timeout {
                timeout_ms: self.timeout_ms,
            }),
        };
        let result = result.and_then(|outputs| {
            signature.check_outputs(&outputs)?;
            Ok(outputs)
        });

        obs::emit_model_call(
            &signature.name,
            started.elapsed().as_millis() as u64,
            result.is_ok(),
        );
        result
    }
}

impl std::fmt::Debug for Predictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predictor")
            .field("timeout_ms", &self.timeout_ms)
            .finish_non_exhaustive()
    }
}
