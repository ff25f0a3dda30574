use serde::{Deserialize, Serialize};

use crate::error::{InsightsError, Result};

pub const DEFAULT_AI_MODEL: &str = "@cf/meta/llama-3.1-8b-instruct";
pub const DEFAULT_AI_BASE_URL: &str = "https://api.cloudflare.com/client/v4";
/// Upper bound on tokens the model may generate for one insight.
pub const MAX_OUTPUT_TOKENS_CAP: u32 = 500;
const MIN_TIMEOUT_MS: u64 = 1_000;
const MAX_TIMEOUT_MS: u64 = 120_000;

/// Main configuration structure loaded from feedback_insights.toml and environment variables
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Config {
    pub inference: InferenceConfig,
    pub store: StoreConfig,
    pub server: ServerConfig,
    /// Runtime configuration loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// Workers AI inference settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub account_id: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_ms: u64,
    pub max_output_tokens: u32,
    /// Never read from the TOML file; only CLOUDFLARE_API_TOKEN sets it
    #[serde(skip)]
    pub api_token: Option<String>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            account_id: None,
            model: DEFAULT_AI_MODEL.to_string(),
            base_url: DEFAULT_AI_BASE_URL.to_string(),
            timeout_ms: 20_000,
            max_output_tokens: MAX_OUTPUT_TOKENS_CAP,
            api_token: None,
        }
    }
}

impl InferenceConfig {
    /// Both the account and the token are needed to reach Workers AI
    pub fn is_configured(&self) -> bool {
        self.account_id.as_deref().is_some_and(|s| !s.is_empty())
            && self.api_token.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// Feedback store settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub database_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: "feedback.db".to_string(),
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub http_bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_bind: "127.0.0.1:8787".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> Result<std::net::SocketAddr> {
        self.http_bind
            .parse()
            .map_err(|e| InsightsError::Config {
                message: format!("invalid http_bind '{}': {}", self.http_bind, e),
            })
    }
}

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_level: "feedback_insights=info,tower_http=info".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Load runtime configuration from environment variables
    pub fn load_from_env() -> Self {
        Self {
            log_level: std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "feedback_insights=info,tower_http=info".to_string()),
        }
    }
}

/// Load the dotenv file: INSIGHTS_ENV_FILE if set, else ./.env.
///
/// Safe to call more than once; variables already set are never overwritten.
pub fn load_env_file() {
    if let Ok(env_path) = std::env::var("INSIGHTS_ENV_FILE") {
        let _ = dotenvy::from_path(env_path);
    } else {
        let _ = dotenvy::from_path(".env");
    }
}

impl Config {
    /// Load configuration from TOML file and environment variables
    /// Uses FEEDBACK_INSIGHTS_CONFIG environment variable or defaults to "feedback_insights.toml"
    pub fn load() -> Result<Self> {
        load_env_file();

        let config_path = std::env::var("FEEDBACK_INSIGHTS_CONFIG")
            .unwrap_or_else(|_| "feedback_insights.toml".to_string());

        let mut config = if let Ok(content) = std::fs::read_to_string(&config_path) {
            Self::from_toml(&content)?
        } else {
            tracing::warn!("Config file {} not found, using defaults", config_path);
            Self::default()
        };

        config.apply_env_overrides();
        config.runtime = RuntimeConfig::load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Parse the TOML representation without touching the environment
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| InsightsError::Config {
            message: e.to_string(),
        })
    }

    /// Apply env-first overrides on top of file values
    pub fn apply_env_overrides(&mut self) {
        if let Ok(account) = std::env::var("CLOUDFLARE_ACCOUNT_ID") {
            self.inference.account_id = Some(account);
        }
        self.inference.api_token = std::env::var("CLOUDFLARE_API_TOKEN").ok();
        if let Ok(model) = std::env::var("INSIGHTS_AI_MODEL") {
            self.inference.model = model;
        }
        if let Ok(base) = std::env::var("INSIGHTS_AI_BASE_URL") {
            self.inference.base_url = base;
        }
        if let Some(timeout) = std::env::var("INSIGHTS_AI_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            self.inference.timeout_ms = timeout;
        }
        if let Some(tokens) = std::env::var("INSIGHTS_MAX_OUTPUT_TOKENS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
        {
            self.inference.max_output_tokens = tokens;
        }
        if let Ok(path) = std::env::var("INSIGHTS_DB_PATH") {
            self.store.database_path = path;
        }
        if let Ok(bind) = std::env::var("INSIGHTS_HTTP_BIND") {
            self.server.http_bind = bind;
        }
    }

    /// Clamp numeric settings and reject values that cannot work
    pub fn validate(&mut self) -> Result<()> {
        if self.inference.max_output_tokens == 0 {
            self.inference.max_output_tokens = 1;
        } else if self.inference.max_output_tokens > MAX_OUTPUT_TOKENS_CAP {
            tracing::warn!(
                "max_output_tokens {} exceeds cap {}, clamping",
                self.inference.max_output_tokens,
                MAX_OUTPUT_TOKENS_CAP
            );
            self.inference.max_output_tokens = MAX_OUTPUT_TOKENS_CAP;
        }

        self.inference.timeout_ms = self.inference.timeout_ms.clamp(MIN_TIMEOUT_MS, MAX_TIMEOUT_MS);

        if !self.inference.base_url.starts_with("http://")
            && !self.inference.base_url.starts_with("https://")
        {
            return Err(InsightsError::Config {
                message: format!(
                    "inference base_url '{}' must start with http:// or https://",
                    self.inference.base_url
                ),
            });
        }

        if self.store.database_path.trim().is_empty() {
            return Err(InsightsError::Config {
                message: "store.database_path must not be empty".to_string(),
            });
        }

        self.server.bind_addr()?;

        if !self.inference.is_configured() {
            tracing::warn!(
                "CLOUDFLARE_ACCOUNT_ID/CLOUDFLARE_API_TOKEN not set; insights will use the heuristic fallback"
            );
        }

        Ok(())
    }
}
