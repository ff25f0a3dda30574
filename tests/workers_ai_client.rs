//! Drives the Workers AI client against a local stand-in for the REST API.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};

use feedback_insights::clients::{
    InferenceClient, InferenceError, InferenceOptions, InferenceOutput, WorkersAiClient,
};
use feedback_insights::feedback::FeedbackItem;
use feedback_insights::insights::{AnalysisMode, InsightEngine};
use feedback_insights::prompts;

type Captured = Arc<Mutex<Vec<(Option<String>, Value)>>>;

async fn run_model(
    State(captured): State<Captured>,
    Path((_account, model)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    captured.lock().unwrap().push((auth, body));

    match model.as_str() {
        "text" => Json(json!({
            "success": true,
            "errors": [],
            "result": {"response": "```json\n{\"positive_summary\": [\"Fast deploys\"]}\n```"}
        }))
        .into_response(),
        "object" => Json(json!({
            "success": true,
            "result": {"response": {"negative_keywords": ["latency"]}}
        }))
        .into_response(),
        "refused" => Json(json!({
            "success": false,
            "errors": [{"code": 3040, "message": "Capacity temporarily exceeded"}],
            "result": null
        }))
        .into_response(),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Json(json!({"success": true, "result": {"response": "{}"}})).into_response()
        }
        "stall" => {
            // headers go out immediately, the body never arrives in time
            let body = futures_util::stream::once(async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Ok::<_, std::io::Error>(Bytes::from_static(b"{}"))
            });
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                Body::from_stream(body),
            )
                .into_response()
        }
        _ => (StatusCode::UNAUTHORIZED, "Authentication error").into_response(),
    }
}

async fn spawn_api() -> (String, Captured) {
    let captured: Captured = Arc::default();
    let app = Router::new()
        .route("/accounts/:account/ai/run/:model", post(run_model))
        .with_state(captured.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), captured)
}

fn client(base: &str, model: &str, timeout_ms: u64) -> WorkersAiClient {
    WorkersAiClient::new(base, "acct", model, "secret-token", timeout_ms).unwrap()
}

#[tokio::test]
async fn text_response_is_returned_and_request_is_well_formed() {
    let (base, captured) = spawn_api().await;
    let schema = prompts::insight_schema();
    let options = InferenceOptions {
        max_output_tokens: 256,
        temperature: 0.0,
    };

    let output = client(&base, "text", 5_000)
        .infer("analyze this", &schema, &options)
        .await
        .unwrap();
    assert!(matches!(output, InferenceOutput::Text(ref t) if t.starts_with("```json")));

    let calls = captured.lock().unwrap();
    let (auth, body) = &calls[0];
    assert_eq!(auth.as_deref(), Some("Bearer secret-token"));
    assert_eq!(body["max_tokens"], 256);
    assert_eq!(body["temperature"], 0.0);
    assert_eq!(body["response_format"]["type"], "json_schema");
    assert_eq!(body["response_format"]["json_schema"], schema);
    assert_eq!(body["messages"][1]["role"], "user");
    assert_eq!(body["messages"][1]["content"], "analyze this");
}

#[tokio::test]
async fn object_response_is_returned_as_json() {
    let (base, _) = spawn_api().await;
    let output = client(&base, "object", 5_000)
        .infer("p", &json!({}), &InferenceOptions::default())
        .await
        .unwrap();
    assert_eq!(
        output,
        InferenceOutput::Json(json!({"negative_keywords": ["latency"]}))
    );
}

#[tokio::test]
async fn unsuccessful_envelope_is_an_api_error() {
    let (base, _) = spawn_api().await;
    let err = client(&base, "refused", 5_000)
        .infer("p", &json!({}), &InferenceOptions::default())
        .await
        .unwrap_err();
    match err {
        InferenceError::Api { message, .. } => {
            assert_eq!(message, "Capacity temporarily exceeded")
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn http_error_status_is_surfaced() {
    let (base, _) = spawn_api().await;
    let err = client(&base, "unknown", 5_000)
        .infer("p", &json!({}), &InferenceOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, InferenceError::Api { status: 401, .. }));
}

#[tokio::test]
async fn slow_upstream_times_out() {
    let (base, _) = spawn_api().await;
    let err = client(&base, "slow", 200)
        .infer("p", &json!({}), &InferenceOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, InferenceError::Timeout { timeout_ms: 200 }));
}

#[tokio::test]
async fn stalled_body_is_reported_as_timeout() {
    let (base, _) = spawn_api().await;
    let err = client(&base, "stall", 300)
        .infer("p", &json!({}), &InferenceOptions::default())
        .await
        .unwrap_err();
    assert!(
        matches!(err, InferenceError::Timeout { timeout_ms: 300 }),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn engine_decodes_fenced_workers_ai_output() {
    let (base, _) = spawn_api().await;
    let engine = InsightEngine::new(Arc::new(client(&base, "text", 5_000)));
    let result = engine
        .analyze("Workers", &[FeedbackItem::new("email", "Deploys are fast")])
        .await;
    assert_eq!(result.analysis_mode, AnalysisMode::WorkersAi);
    assert_eq!(result.positive_summary, vec!["Fast deploys"]);
}

#[tokio::test]
async fn engine_falls_back_when_workers_ai_refuses() {
    let (base, _) = spawn_api().await;
    let engine = InsightEngine::new(Arc::new(client(&base, "refused", 5_000)));
    let result = engine
        .analyze("Workers", &[FeedbackItem::new("email", "Builds are slow")])
        .await;
    assert_eq!(result.analysis_mode, AnalysisMode::SimulatedFallback);
    assert_eq!(result.negative_count, Some(1));
    assert!(
        result
            .fallback_reason
            .unwrap()
            .contains("Capacity temporarily exceeded")
    );
}
