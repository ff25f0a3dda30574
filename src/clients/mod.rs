pub mod traits;
pub mod workers_ai;

use std::sync::Arc;

use crate::config::InferenceConfig;

pub use traits::{
    InferenceClient, InferenceError, InferenceOptions, InferenceOutput, UnavailableClient,
};
pub use workers_ai::WorkersAiClient;

/// Pick the inference client for this configuration.
///
/// Missing credentials or a client that cannot be built degrade to
/// [`UnavailableClient`], so callers always get heuristic insights.
pub fn client_from_config(config: &InferenceConfig) -> Arc<dyn InferenceClient> {
    match WorkersAiClient::from_config(config) {
        Some(Ok(client)) => {
            tracing::info!(model = %config.model, "Workers AI inference enabled");
            Arc::new(client)
        }
        Some(Err(e)) => {
            tracing::warn!("Workers AI client unavailable: {}", e);
            Arc::new(UnavailableClient)
        }
        None => Arc::new(UnavailableClient),
    }
}
