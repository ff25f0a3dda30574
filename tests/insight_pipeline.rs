mod common;

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use common::{GOOD_PAYLOAD, Script, ScriptedClient};
use feedback_insights::clients::{InferenceClient, UnavailableClient};
use feedback_insights::feedback::{FeedbackItem, FeedbackRecord, ProductScope};
use feedback_insights::insights::{AnalysisMode, InsightEngine, InsightsResponse};

fn items(comments: &[&str]) -> Vec<FeedbackItem> {
    comments
        .iter()
        .map(|c| FeedbackItem::new("email", *c))
        .collect()
}

fn record(id: i64, product: &str, comment: &str) -> FeedbackRecord {
    FeedbackRecord {
        id,
        product: product.to_string(),
        source: "discord".to_string(),
        comment: comment.to_string(),
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn empty_feedback_short_circuits_without_inference() {
    let client = ScriptedClient::text(GOOD_PAYLOAD);
    let engine = InsightEngine::new(client.clone());
    let result = engine.analyze("Workers", &[]).await;

    assert_eq!(result.analysis_mode, AnalysisMode::Empty);
    assert_eq!(result.positive_count, Some(0));
    assert_eq!(result.negative_count, Some(0));
    assert_eq!(result.positive_summary, vec!["No feedback found."]);
    assert_eq!(result.negative_summary, vec!["No feedback found."]);
    assert!(result.positive_keywords.is_empty());
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn clean_ai_payload_is_used_verbatim() {
    let client = ScriptedClient::text(GOOD_PAYLOAD);
    let engine = InsightEngine::new(client.clone());
    let result = engine
        .analyze("Workers", &items(&["Deploys are fast"]))
        .await;

    assert_eq!(result.analysis_mode, AnalysisMode::WorkersAi);
    assert_eq!(result.fallback_reason, None);
    assert_eq!(result.positive_count, None);
    assert_eq!(result.positive_summary, vec!["Deploys are quick"]);
    assert_eq!(result.negative_keywords, vec!["docs"]);
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn fenced_ai_payload_is_decoded() {
    let fenced = format!("```json\n{}\n```", GOOD_PAYLOAD);
    let engine = InsightEngine::new(ScriptedClient::text(&fenced));
    let result = engine.analyze("Workers", &items(&["ok"])).await;
    assert_eq!(result.analysis_mode, AnalysisMode::WorkersAi);
    assert_eq!(result.positive_keywords, vec!["deploys", "speed"]);
}

#[tokio::test]
async fn already_parsed_object_passes_through() {
    let client = ScriptedClient::new(Script::Json(json!({
        "positive_summary": ["Pricing is fair"],
    })));
    let engine = InsightEngine::new(client);
    let result = engine.analyze("R2", &items(&["cheap storage"])).await;

    assert_eq!(result.analysis_mode, AnalysisMode::WorkersAi);
    assert_eq!(result.positive_summary, vec!["Pricing is fair"]);
    // missing fields become empty lists
    assert!(result.negative_summary.is_empty());
    assert!(result.positive_keywords.is_empty());
    assert!(result.negative_keywords.is_empty());
}

#[tokio::test]
async fn malformed_ai_output_falls_back_with_parse_reason() {
    let engine = InsightEngine::new(ScriptedClient::text("Sure! Here are some thoughts."));
    let result = engine
        .analyze("Workers", &items(&["This is fast and easy to use"]))
        .await;

    assert_eq!(result.analysis_mode, AnalysisMode::SimulatedFallback);
    assert_eq!(
        result.fallback_reason.as_deref(),
        Some("AI response could not be parsed as JSON")
    );
    assert_eq!(result.positive_count, Some(1));
}

#[tokio::test]
async fn json_array_output_counts_as_unparseable() {
    let engine = InsightEngine::new(ScriptedClient::new(Script::Json(json!(["a", "b"]))));
    let result = engine.analyze("Workers", &items(&["good"])).await;
    assert_eq!(result.analysis_mode, AnalysisMode::SimulatedFallback);
}

#[tokio::test]
async fn inference_failure_falls_back_with_error_reason() {
    let client = ScriptedClient::failing();
    let engine = InsightEngine::new(client.clone());
    let result = engine
        .analyze("Workers", &items(&["This is fast and easy to use"]))
        .await;

    assert_eq!(result.analysis_mode, AnalysisMode::SimulatedFallback);
    let reason = result.fallback_reason.unwrap();
    assert!(reason.starts_with("AI inference failed: "), "{}", reason);
    assert!(reason.contains("upstream unavailable"));
    assert_eq!(result.positive_count, Some(1));
    assert_eq!(result.negative_count, Some(0));
    assert!(result.positive_keywords.contains(&"fast".to_string()));
    assert!(result.positive_keywords.contains(&"easy".to_string()));
    // no retry
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn unconfigured_client_yields_negative_fallback() {
    let client: Arc<dyn InferenceClient> = Arc::new(UnavailableClient);
    let engine = InsightEngine::new(client);
    let result = engine
        .analyze(
            "Docs",
            &items(&["The onboarding is confusing and the docs are outdated"]),
        )
        .await;

    assert_eq!(result.analysis_mode, AnalysisMode::SimulatedFallback);
    assert_eq!(
        result.fallback_reason.as_deref(),
        Some("AI inference failed: inference is not configured")
    );
    assert_eq!(result.positive_count, Some(0));
    assert_eq!(result.negative_count, Some(1));
    assert!(result.negative_keywords.contains(&"confusing".to_string()));
    assert!(result.negative_keywords.contains(&"outdated".to_string()));
}

#[tokio::test]
async fn all_scope_returns_one_entry_per_product() {
    let client = ScriptedClient::failing();
    let engine = InsightEngine::new(client.clone());
    let records = vec![
        record(1, "Workers", "Deploys are fast"),
        record(2, "D1", "Queries are slow"),
        record(3, "Workers", "Great docs"),
    ];

    let response = engine.analyze_scope(&ProductScope::All, &records).await;
    let InsightsResponse::All(map) = response else {
        panic!("expected a product map");
    };
    assert_eq!(map.keys().collect::<Vec<_>>(), vec!["D1", "Workers"]);
    assert_eq!(map["Workers"].positive_count, Some(2));
    assert_eq!(map["D1"].negative_count, Some(1));
    assert_eq!(client.calls(), 2);
}

#[tokio::test]
async fn all_scope_folds_product_case() {
    let engine = InsightEngine::new(ScriptedClient::failing());
    let records = vec![
        record(1, "Workers", "Deploys are fast"),
        record(2, "workers", "Builds are slow"),
        record(3, "D1", "Queries are slow"),
    ];

    let map = engine.analyze_all(&records).await;
    assert_eq!(map.keys().collect::<Vec<_>>(), vec!["D1", "Workers"]);
    assert_eq!(map["Workers"].positive_count, Some(1));
    assert_eq!(map["Workers"].negative_count, Some(1));
}

#[tokio::test]
async fn all_scope_without_records_is_an_empty_map() {
    let engine = InsightEngine::new(ScriptedClient::failing());
    let response = engine.analyze_scope(&ProductScope::All, &[]).await;
    assert_eq!(response, InsightsResponse::All(Default::default()));
}

#[tokio::test]
async fn product_scope_returns_single_result() {
    let engine = InsightEngine::new(ScriptedClient::text(GOOD_PAYLOAD));
    let records = vec![record(1, "Workers", "Deploys are fast")];
    let response = engine
        .analyze_scope(&ProductScope::Product("Workers".to_string()), &records)
        .await;

    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(value["analysis_mode"], "workers_ai");
    assert_eq!(value["positive_summary"], json!(["Deploys are quick"]));
}

#[tokio::test]
async fn token_budget_is_forwarded() {
    let engine = InsightEngine::new(ScriptedClient::failing()).with_max_output_tokens(128);
    assert_eq!(engine.options().max_output_tokens, 128);
    assert_eq!(engine.options().temperature, 0.0);
}
