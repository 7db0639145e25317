//! Chat-completions adapter for OpenAI-compatible endpoints.
//!
//! A [`Signature`] is rendered into a system prompt that lists the input and
//! output fields; inputs go in the user message. The model is asked for a
//! single JSON object (JSON response mode), which becomes the output
//! [`FieldValues`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::LmError;
use super::signature::{FieldValues, Signature};
use super::LanguageModel;
use crate::config::ModelConfig;
use crate::domain::{NumevalError, Result};

#[derive(Debug, Clone)]
pub struct OpenAiChatModel {
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: Option<f32>,
    http_client: reqwest::Client,
}

impl OpenAiChatModel {
    /// Build a client from configuration. Fails without an API key.
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                NumevalError::Configuration(
                    "no API key configured (set NUMEVAL_API_KEY or OPENAI_API_KEY, \
                     or add api_key to key.env)"
                        .to_string(),
                )
            })?
            .to_string();

        let http_client = reqwest::Client::builder()
            .build()
            .map_err(|e| NumevalError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            http_client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl LanguageModel for OpenAiChatModel {
    async fn predict(
        &self,
        signature: &Signature,
        inputs: &FieldValues,
    ) -> std::result::Result<FieldValues, LmError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: render_system_prompt(signature),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: render_user_prompt(signature, inputs),
                },
            ],
            max_tokens: Some(self.max_tokens),
            temperature: self.temperature,
            response_format: ResponseFormat {
                kind: "json_object".to_string(),
            },
        };

        let response = self
            .http_client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LmError::InvalidResponse(format!("completion body: {e}")))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LmError::InvalidResponse("completion has no content".to_string()))?;

        parse_completion(&content)
    }
}

/// System prompt describing the task and the expected JSON shape.
pub fn render_system_prompt(signature: &Signature) -> String {
    let mut prompt = String::new();
    prompt.push_str(signature.instructions.trim());
    prompt.push_str("\n\nYou will receive these input fields:\n");
    for field in &signature.inputs {
        prompt.push_str(&format!("- {}: {}\n", field.name, field.description));
    }
    prompt.push_str("\nRespond with a single JSON object containing these keys:\n");
    for field in &signature.outputs {
        let marker = if field.required { "" } else { " (optional, may be null)" };
        prompt.push_str(&format!(
            "- {}{}: {}\n",
            field.name, marker, field.description
        ));
    }
    prompt.push_str("\nDo not include any text outside the JSON object.");
    prompt
}

/// User message carrying the input values, one section per field.
pub fn render_user_prompt(signature: &Signature, inputs: &FieldValues) -> String {
    let mut sections = Vec::with_capacity(signature.inputs.len());
    for field in &signature.inputs {
        let value = match inputs.get(&field.name) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
            None => String::new(),
        };
        sections.push(format!("## {}\n{}", field.name, value));
    }
    sections.join("\n\n")
}

/// Parse the model's reply into an object, tolerating a Markdown code fence.
pub fn parse_completion(content: &str) -> std::result::Result<FieldValues, LmError> {
    let body = strip_code_fence(content);
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(LmError::InvalidResponse(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(LmError::InvalidResponse(format!("reply is not JSON: {e}"))),
    }
}

/// Content of a Markdown code fence, or the trimmed text when unfenced.
pub(crate) fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an info string such as `json` on the opening fence line.
    let rest = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}
