//! Feedback input types shared by the store, the engine and the HTTP layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single comment handed to the analysis pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackItem {
    pub source: String,
    pub comment: String,
}

impl FeedbackItem {
    pub fn new(source: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            comment: comment.into(),
        }
    }
}

/// A stored feedback row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: i64,
    pub product: String,
    pub source: String,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl From<&FeedbackRecord> for FeedbackItem {
    fn from(record: &FeedbackRecord) -> Self {
        FeedbackItem {
            source: record.source.clone(),
            comment: record.comment.clone(),
        }
    }
}

/// Which products a query covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductScope {
    All,
    Product(String),
}

impl ProductScope {
    /// `None`, blank, and the sentinel "all" (any case) select every product
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None => ProductScope::All,
            Some(s) if s.is_empty() || s.eq_ignore_ascii_case("all") => ProductScope::All,
            Some(s) => ProductScope::Product(s.to_string()),
        }
    }
}
