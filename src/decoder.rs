//! Lenient decoding of model output into a JSON object.
//!
//! Models wrap JSON in code fences or chatter, so decoding walks a ladder:
//! raw parse, fence-stripped parse, then the outermost `{...}` span. Anything
//! that still fails is reported as `None`, never as a panic.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::clients::InferenceOutput;

static LEADING_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^```(?:json)?\s*").unwrap());
static TRAILING_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*```$").unwrap());

/// Decode an inference response into a JSON object.
///
/// Objects pass straight through; strings (bare or JSON-wrapped) go through
/// [`decode_text`]. Any other JSON value is rejected.
pub fn decode(raw: &InferenceOutput) -> Option<Map<String, Value>> {
    match raw {
        InferenceOutput::Text(text) => decode_text(text),
        InferenceOutput::Json(Value::Object(obj)) => Some(obj.clone()),
        InferenceOutput::Json(Value::String(text)) => decode_text(text),
        InferenceOutput::Json(_) => None,
    }
}

/// Run the parsing ladder over model text.
pub fn decode_text(raw: &str) -> Option<Map<String, Value>> {
    if let Some(obj) = parse_object(raw) {
        return Some(obj);
    }

    let stripped = strip_fences(raw);
    if let Some(obj) = parse_object(&stripped) {
        return Some(obj);
    }

    let start = stripped.find('{')?;
    let end = stripped.rfind('}')?;
    if start >= end {
        return None;
    }
    parse_object(&stripped[start..=end])
}

/// Remove a leading ``` / ```json fence and a trailing ``` fence.
pub fn strip_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_lead = LEADING_FENCE.replace(trimmed, "");
    TRAILING_FENCE.replace(&without_lead, "").trim().to_string()
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(obj)) => Some(obj),
        _ => None,
    }
}
