//! HTTP transport for feedback-insights
//!
//! Axum server exposing the insight query alongside feedback listing, health
//! and metrics. Everything is plain JSON.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{Query, State},
    http::{Request, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::Config;
use crate::error::{InsightsError, Result};
use crate::feedback::{FeedbackRecord, ProductScope};
use crate::insights::{InsightEngine, InsightResult, InsightsResponse};
use crate::store::FeedbackSource;

/// Shared state for HTTP server
#[derive(Clone)]
pub struct HttpState {
    pub config: Arc<Config>,
    pub source: Arc<dyn FeedbackSource>,
    pub engine: Arc<InsightEngine>,
    pub metrics: Arc<Mutex<HttpMetrics>>,
}

impl HttpState {
    pub fn new(config: Config, source: Arc<dyn FeedbackSource>, engine: InsightEngine) -> Self {
        Self {
            config: Arc::new(config),
            source,
            engine: Arc::new(engine),
            metrics: Arc::new(Mutex::new(HttpMetrics::new())),
        }
    }
}

/// Metrics for HTTP server
#[derive(Debug, Clone)]
pub struct HttpMetrics {
    pub total_requests: u64,
    pub errors_total: u64,
    pub last_request_unix: u64,
    /// Insights served per analysis mode
    pub insights_by_mode: HashMap<&'static str, u64>,
}

impl HttpMetrics {
    fn new() -> Self {
        Self {
            total_requests: 0,
            errors_total: 0,
            last_request_unix: unix_now(),
            insights_by_mode: HashMap::new(),
        }
    }

    fn record_insight(&mut self, result: &InsightResult) {
        *self
            .insights_by_mode
            .entry(result.analysis_mode.as_str())
            .or_insert(0) += 1;
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub product: Option<String>,
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    "ok"
}

/// Raw feedback for a product or for all products
pub async fn feedback_handler(
    State(state): State<HttpState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<FeedbackRecord>>> {
    let scope = ProductScope::parse(query.product.as_deref());
    Ok(Json(state.source.fetch(&scope).await?))
}

/// Distinct product names
pub async fn products_handler(State(state): State<HttpState>) -> Result<Json<Vec<String>>> {
    Ok(Json(state.source.products().await?))
}

/// Insight query: one result for a product, a map for "all"
pub async fn insights_handler(
    State(state): State<HttpState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<InsightsResponse>> {
    let scope = ProductScope::parse(query.product.as_deref());
    let records = state.source.fetch(&scope).await?;
    tracing::debug!(?scope, records = records.len(), "insight query");

    let response = state.engine.analyze_scope(&scope, &records).await;

    let mut metrics = state.metrics.lock().await;
    match &response {
        InsightsResponse::Single(result) => metrics.record_insight(result),
        InsightsResponse::All(results) => results.values().for_each(|r| metrics.record_insight(r)),
    }
    drop(metrics);

    Ok(Json(response))
}

/// Metrics endpoint
pub async fn metrics_handler(State(state): State<HttpState>) -> impl IntoResponse {
    let metrics = state.metrics.lock().await.clone();
    (
        StatusCode::OK,
        Json(json!({
            "metrics_version": "1",
            "total_requests": metrics.total_requests,
            "errors_total": metrics.errors_total,
            "last_request_unix": metrics.last_request_unix,
            "insights_by_mode": metrics.insights_by_mode,
            "inference": {
                "model": state.config.inference.model,
                "configured": state.config.inference.is_configured(),
            }
        })),
    )
}

async fn track_requests(
    State(metrics): State<Arc<Mutex<HttpMetrics>>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let resp = next.run(req).await;
    let mut m = metrics.lock().await;
    m.total_requests = m.total_requests.saturating_add(1);
    if !resp.status().is_success() {
        m.errors_total = m.errors_total.saturating_add(1);
    }
    m.last_request_unix = unix_now();
    resp
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "application/json")],
        json!({"error": {"code": 404, "message": "Not found"}}).to_string(),
    )
        .into_response()
}

/// Build the application router
pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/feedback", get(feedback_handler))
        .route("/api/products", get(products_handler))
        .route("/api/insights", get(insights_handler))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
                .layer(middleware::from_fn_with_state(
                    state.metrics.clone(),
                    track_requests,
                )),
        )
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_http_server(state: HttpState) -> Result<()> {
    let bind = state.config.server.bind_addr()?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| InsightsError::Internal {
            message: format!("Failed to bind HTTP listener: {}", e),
        })?;

    tracing::info!("Starting HTTP server on {}", bind);

    axum::serve(listener, app)
        .await
        .map_err(|e| InsightsError::Internal {
            message: format!("HTTP server error: {}", e),
        })?;

    Ok(())
}
