pub mod classifier;
pub mod clients;
pub mod config;
pub mod decoder;
pub mod error;
pub mod feedback;
pub mod http;
pub mod insights;
pub mod keywords;
pub mod prompts;
pub mod store;

pub use error::{InsightsError, Result};
pub use feedback::{FeedbackItem, FeedbackRecord, ProductScope};
pub use insights::{AnalysisMode, InsightEngine, InsightResult, InsightsResponse};
