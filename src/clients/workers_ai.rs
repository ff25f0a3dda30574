//! Cloudflare Workers AI client over the REST API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clients::traits::{InferenceClient, InferenceError, InferenceOptions, InferenceOutput};
use crate::config::InferenceConfig;

const SYSTEM_PROMPT: &str = "You analyze product feedback and respond with JSON only.";

#[derive(Debug, Serialize)]
struct RunRequest<'a> {
    messages: Vec<Message<'a>>,
    response_format: ResponseFormat<'a>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    json_schema: &'a Value,
}

/// `{ success, errors, result: { response } }` envelope
#[derive(Debug, Deserialize)]
struct RunEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    #[serde(default)]
    result: Option<RunResult>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct RunResult {
    #[serde(default)]
    response: Value,
}

#[derive(Debug, Clone)]
pub struct WorkersAiClient {
    client: Client,
    endpoint: String,
    api_token: String,
    timeout_ms: u64,
}

impl WorkersAiClient {
    pub fn new(
        base_url: &str,
        account_id: &str,
        model: &str,
        api_token: impl Into<String>,
        timeout_ms: u64,
    ) -> Result<Self, InferenceError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| InferenceError::Http(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: format!(
                "{}/accounts/{}/ai/run/{}",
                base_url.trim_end_matches('/'),
                account_id,
                model
            ),
            api_token: api_token.into(),
            timeout_ms,
        })
    }

    /// Build from config; `None` when the account or token is missing
    pub fn from_config(config: &InferenceConfig) -> Option<Result<Self, InferenceError>> {
        let account_id = config.account_id.as_deref().filter(|s| !s.is_empty())?;
        let token = config.api_token.as_deref().filter(|s| !s.is_empty())?;
        Some(Self::new(
            &config.base_url,
            account_id,
            &config.model,
            token,
            config.timeout_ms,
        ))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl InferenceClient for WorkersAiClient {
    async fn infer(
        &self,
        prompt: &str,
        schema: &Value,
        options: &InferenceOptions,
    ) -> Result<InferenceOutput, InferenceError> {
        let body = build_request(prompt, schema, options);

        tracing::debug!(endpoint = %self.endpoint, "calling Workers AI");
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InferenceError::Timeout {
                        timeout_ms: self.timeout_ms,
                    }
                } else {
                    InferenceError::Http(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            return Err(InferenceError::Api {
                status: status.as_u16(),
                message: body_text,
            });
        }

        let envelope: RunEnvelope = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                InferenceError::Timeout {
                    timeout_ms: self.timeout_ms,
                }
            } else {
                InferenceError::Parse(e.to_string())
            }
        })?;
        output_from_envelope(envelope, status.as_u16())
    }
}

fn output_from_envelope(
    envelope: RunEnvelope,
    status: u16,
) -> Result<InferenceOutput, InferenceError> {
    if !envelope.success {
        let message = envelope
            .errors
            .iter()
            .map(|e| e.message.as_str())
            .filter(|m| !m.is_empty())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(InferenceError::Api {
            status,
            message: if message.is_empty() {
                "request reported success=false".to_string()
            } else {
                message
            },
        });
    }

    match envelope.result.map(|r| r.response) {
        Some(Value::String(text)) => Ok(InferenceOutput::Text(text)),
        Some(Value::Null) | None => Err(InferenceError::Parse(
            "response envelope carried no result".to_string(),
        )),
        Some(other) => Ok(InferenceOutput::Json(other)),
    }
}

fn build_request<'a>(
    prompt: &'a str,
    schema: &'a Value,
    options: &InferenceOptions,
) -> RunRequest<'a> {
    RunRequest {
        messages: vec![
            Message {
                role: "system",
                content: SYSTEM_PROMPT,
            },
            Message {
                role: "user",
                content: prompt,
            },
        ],
        response_format: ResponseFormat {
            kind: "json_schema",
            json_schema: schema,
        },
        max_tokens: options.max_output_tokens,
        temperature: options.temperature,
    }
}
