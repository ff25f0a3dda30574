//! Insight orchestration: AI first, heuristic fallback on any failure.
//!
//! `InsightEngine::analyze` never returns an error. Empty input short-circuits
//! to an "empty" result, inference or decode failures fall back to the
//! heuristic classifier, and partial AI payloads are padded with empty lists.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::classifier::{self, Classification};
use crate::clients::{InferenceClient, InferenceOptions};
use crate::decoder;
use crate::feedback::{FeedbackItem, FeedbackRecord, ProductScope};
use crate::keywords::MAX_KEYWORDS;
use crate::prompts;

const NO_FEEDBACK: &str = "No feedback found.";

/// How an insight was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    Empty,
    WorkersAi,
    SimulatedFallback,
}

impl AnalysisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::Empty => "empty",
            AnalysisMode::WorkersAi => "workers_ai",
            AnalysisMode::SimulatedFallback => "simulated_fallback",
        }
    }
}

/// Structured sentiment insight for one product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightResult {
    pub analysis_mode: AnalysisMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positive_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_count: Option<usize>,
    pub positive_keywords: Vec<String>,
    pub negative_keywords: Vec<String>,
    pub positive_summary: Vec<String>,
    pub negative_summary: Vec<String>,
}

impl InsightResult {
    /// Result for a scope with no feedback at all
    pub fn empty() -> Self {
        Self {
            analysis_mode: AnalysisMode::Empty,
            fallback_reason: None,
            positive_count: Some(0),
            negative_count: Some(0),
            positive_keywords: Vec::new(),
            negative_keywords: Vec::new(),
            positive_summary: vec![NO_FEEDBACK.to_string()],
            negative_summary: vec![NO_FEEDBACK.to_string()],
        }
    }

    /// Normalize a decoded AI payload; missing or malformed fields become empty lists
    pub fn from_ai_payload(payload: &Map<String, Value>) -> Self {
        Self {
            analysis_mode: AnalysisMode::WorkersAi,
            fallback_reason: None,
            positive_count: None,
            negative_count: None,
            positive_keywords: keyword_list(payload, "positive_keywords"),
            negative_keywords: keyword_list(payload, "negative_keywords"),
            positive_summary: string_list(payload, "positive_summary"),
            negative_summary: string_list(payload, "negative_summary"),
        }
    }

    /// Wrap a heuristic classification together with the reason AI was skipped
    pub fn fallback(reason: impl Into<String>, classification: Classification) -> Self {
        Self {
            analysis_mode: AnalysisMode::SimulatedFallback,
            fallback_reason: Some(reason.into()),
            positive_count: Some(classification.positive_count),
            negative_count: Some(classification.negative_count),
            positive_keywords: classification.positive_keywords,
            negative_keywords: classification.negative_keywords,
            positive_summary: classification.positive_summary,
            negative_summary: classification.negative_summary,
        }
    }
}

/// Response shape for an insight query
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InsightsResponse {
    Single(InsightResult),
    All(BTreeMap<String, InsightResult>),
}

/// String entries of `payload[field]`; anything else yields an empty list
fn string_list(payload: &Map<String, Value>, field: &str) -> Vec<String> {
    payload
        .get(field)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Like `string_list`, deduplicated in order and capped at [`MAX_KEYWORDS`]
fn keyword_list(payload: &Map<String, Value>, field: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    string_list(payload, field)
        .into_iter()
        .filter(|k| seen.insert(k.to_lowercase()))
        .take(MAX_KEYWORDS)
        .collect()
}

/// Runs the AI-then-fallback pipeline. Holds no per-request state.
#[derive(Clone)]
pub struct InsightEngine {
    client: Arc<dyn InferenceClient>,
    options: InferenceOptions,
}

impl InsightEngine {
    pub fn new(client: Arc<dyn InferenceClient>) -> Self {
        Self {
            client,
            options: InferenceOptions::default(),
        }
    }

    /// Lower the output token budget; temperature stays at 0
    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.options.max_output_tokens = max_output_tokens;
        self
    }

    pub fn options(&self) -> &InferenceOptions {
        &self.options
    }

    /// Produce insights for one product's feedback
    pub async fn analyze(&self, product: &str, items: &[FeedbackItem]) -> InsightResult {
        if items.is_empty() {
            tracing::debug!(product, "no feedback, returning empty insight");
            return InsightResult::empty();
        }

        tracing::debug!(product, count = items.len(), "requesting AI insight");
        let prompt = prompts::build_prompt(product, items);
        let schema = prompts::insight_schema();

        let output = match self.client.infer(&prompt, &schema, &self.options).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(product, "AI inference failed, using fallback: {}", e);
                return self.fallback(format!("AI inference failed: {e}"), items);
            }
        };

        match decoder::decode(&output) {
            Some(payload) => {
                tracing::info!(product, "AI insight generated");
                InsightResult::from_ai_payload(&payload)
            }
            None => {
                tracing::warn!(product, "AI response was not valid JSON, using fallback");
                self.fallback("AI response could not be parsed as JSON", items)
            }
        }
    }

    fn fallback(&self, reason: impl Into<String>, items: &[FeedbackItem]) -> InsightResult {
        let comments: Vec<&str> = items.iter().map(|item| item.comment.as_str()).collect();
        InsightResult::fallback(reason, classifier::classify(&comments))
    }

    /// Group records by product and analyze every group concurrently.
    ///
    /// Products are grouped ignoring case, matching how a single-product query
    /// fetches; each group is keyed by the first spelling seen.
    pub async fn analyze_all(&self, records: &[FeedbackRecord]) -> BTreeMap<String, InsightResult> {
        let mut groups: BTreeMap<String, (&str, Vec<FeedbackItem>)> = BTreeMap::new();
        for record in records {
            groups
                .entry(record.product.to_lowercase())
                .or_insert_with(|| (record.product.as_str(), Vec::new()))
                .1
                .push(FeedbackItem::from(record));
        }

        let tasks = groups.values().map(|(product, items)| async move {
            (product.to_string(), self.analyze(product, items).await)
        });
        join_all(tasks).await.into_iter().collect()
    }

    /// Analyze records already filtered to `scope`
    pub async fn analyze_scope(
        &self,
        scope: &ProductScope,
        records: &[FeedbackRecord],
    ) -> InsightsResponse {
        match scope {
            ProductScope::All => InsightsResponse::All(self.analyze_all(records).await),
            ProductScope::Product(product) => {
                let items: Vec<FeedbackItem> = records.iter().map(FeedbackItem::from).collect();
                InsightsResponse::Single(self.analyze(product, &items).await)
            }
        }
    }
}
