//! Prompt text and output schema for AI insight generation

use serde_json::{Value, json};

use crate::feedback::FeedbackItem;

/// The four array fields every insight payload carries
pub const INSIGHT_FIELDS: [&str; 4] = [
    "positive_summary",
    "negative_summary",
    "positive_keywords",
    "negative_keywords",
];

/// JSON schema the model output is constrained to
pub fn insight_schema() -> Value {
    let string_array = json!({"type": "array", "items": {"type": "string"}});
    let properties: serde_json::Map<String, Value> = INSIGHT_FIELDS
        .iter()
        .map(|field| (field.to_string(), string_array.clone()))
        .collect();
    json!({
        "type": "object",
        "properties": properties,
        "required": INSIGHT_FIELDS,
    })
}

/// Build the analysis prompt for one product's feedback
pub fn build_prompt(product: &str, items: &[FeedbackItem]) -> String {
    let listing = items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. [{}] {}", i + 1, item.source, item.comment.trim()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Analyze the following customer feedback for the product \"{product}\".\n\
         Return ONLY a JSON object with these fields:\n\
         - positive_summary: short sentences describing what users like\n\
         - negative_summary: short sentences describing what users struggle with\n\
         - positive_keywords: up to 8 single-word themes from positive feedback\n\
         - negative_keywords: up to 8 single-word themes from negative feedback\n\
         Do not wrap the JSON in markdown and do not add commentary.\n\n\
         Feedback ({count} comments):\n{listing}",
        count = items.len(),
    )
}
