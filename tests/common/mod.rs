#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use feedback_insights::clients::{
    InferenceClient, InferenceError, InferenceOptions, InferenceOutput,
};

/// What a [`ScriptedClient`] answers with
#[derive(Clone)]
pub enum Script {
    Text(String),
    Json(Value),
    Fail,
}

/// Inference double that replays one canned answer and counts calls
pub struct ScriptedClient {
    script: Script,
    calls: AtomicUsize,
}

impl ScriptedClient {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn text(raw: &str) -> Arc<Self> {
        Self::new(Script::Text(raw.to_string()))
    }

    pub fn failing() -> Arc<Self> {
        Self::new(Script::Fail)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceClient for ScriptedClient {
    async fn infer(
        &self,
        _prompt: &str,
        _schema: &Value,
        _options: &InferenceOptions,
    ) -> Result<InferenceOutput, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Text(text) => Ok(InferenceOutput::Text(text.clone())),
            Script::Json(value) => Ok(InferenceOutput::Json(value.clone())),
            Script::Fail => Err(InferenceError::Api {
                status: 503,
                message: "upstream unavailable".to_string(),
            }),
        }
    }
}

pub const GOOD_PAYLOAD: &str = r#"{
    "positive_summary": ["Deploys are quick"],
    "negative_summary": ["Docs lag behind releases"],
    "positive_keywords": ["deploys", "speed"],
    "negative_keywords": ["docs"]
}"#;
