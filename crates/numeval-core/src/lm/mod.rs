//! Language-model boundary.
//!
//! Agents never talk to a provider directly. They declare a [`Signature`],
//! pass [`FieldValues`] through a [`Predictor`], and receive validated
//! outputs. Anything implementing [`LanguageModel`] can stand behind it:
//! [`OpenAiChatModel`] in production, the scripted fakes in tests.

pub mod error;
pub mod openai;
pub mod predictor;
pub mod signature;

use async_trait::async_trait;

pub use error::{LmError, SchemaStage};
pub use openai::OpenAiChatModel;
pub use predictor::Predictor;
pub use signature::{field_text, FieldSpec, FieldValues, Signature};

/// A model that fills in a signature's outputs from its inputs.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn predict(
        &self,
        signature: &Signature,
        inputs: &FieldValues,
    ) -> Result<FieldValues, LmError>;
}
