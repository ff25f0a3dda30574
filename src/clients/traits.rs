use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Generation settings passed with every inference call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InferenceOptions {
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self {
            max_output_tokens: crate::config::MAX_OUTPUT_TOKENS_CAP,
            temperature: 0.0,
        }
    }
}

/// Raw model output: plain text, or JSON when the runtime already parsed it
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceOutput {
    Text(String),
    Json(Value),
}

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("inference is not configured")]
    NotConfigured,
    #[error("inference timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("http error: {0}")]
    Http(String),
    #[error("api error (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("parse error: {0}")]
    Parse(String),
}

/// Schema-constrained text generation
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn infer(
        &self,
        prompt: &str,
        schema: &Value,
        options: &InferenceOptions,
    ) -> Result<InferenceOutput, InferenceError>;
}

/// Client used when no inference credentials exist; every call fails.
#[derive(Debug, Clone, Default)]
pub struct UnavailableClient;

#[async_trait]
impl InferenceClient for UnavailableClient {
    async fn infer(
        &self,
        _prompt: &str,
        _schema: &Value,
        _options: &InferenceOptions,
    ) -> Result<InferenceOutput, InferenceError> {
        Err(InferenceError::NotConfigured)
    }
}
