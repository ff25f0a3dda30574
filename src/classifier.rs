//! Heuristic polarity classifier used when AI insights are unavailable.
//!
//! Each comment is scored against two fixed lexicons and filed into a positive
//! or negative bucket; keywords and summaries are then derived per bucket.

use crate::keywords;

/// Sentiment-bearing substrings that mark a comment as positive
pub const POSITIVE_LEXICON: [&str; 14] = [
    "fast",
    "easy",
    "love",
    "great",
    "helpful",
    "impressed",
    "clear",
    "scalable",
    "affordable",
    "useful",
    "transparent",
    "responsive",
    "smooth",
    "good",
];

/// Sentiment-bearing substrings that mark a comment as negative
pub const NEGATIVE_LEXICON: [&str; 14] = [
    "confusing",
    "unclear",
    "bug",
    "slow",
    "hard",
    "lacking",
    "limited",
    "outdated",
    "missing",
    "inconsistent",
    "expensive",
    "unexpected",
    "difficult",
    "vague",
];

const SUMMARY_THEMES: usize = 5;

/// Polarity of a single comment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Positive,
    Negative,
}

/// Output of the heuristic classifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub positive_count: usize,
    pub negative_count: usize,
    pub positive_keywords: Vec<String>,
    pub negative_keywords: Vec<String>,
    pub positive_summary: Vec<String>,
    pub negative_summary: Vec<String>,
}

/// Count lexicon words contained in the comment, as `(positive, negative)`.
///
/// Matching is by substring, so "fast" also scores inside "breakfast".
pub fn polarity_scores(comment: &str) -> (usize, usize) {
    let lower = comment.to_lowercase();
    let positive = POSITIVE_LEXICON
        .iter()
        .filter(|word| lower.contains(*word))
        .count();
    let negative = NEGATIVE_LEXICON
        .iter()
        .filter(|word| lower.contains(*word))
        .count();
    (positive, negative)
}

/// Negative only when it strictly outscores positive; ties go positive.
pub fn polarity(comment: &str) -> Polarity {
    let (positive, negative) = polarity_scores(comment);
    if negative > positive {
        Polarity::Negative
    } else {
        Polarity::Positive
    }
}

/// Partition `comments` by polarity and summarize each bucket.
pub fn classify<S: AsRef<str>>(comments: &[S]) -> Classification {
    let mut positive: Vec<&str> = Vec::new();
    let mut negative: Vec<&str> = Vec::new();

    for comment in comments {
        let comment = comment.as_ref();
        match polarity(comment) {
            Polarity::Positive => positive.push(comment),
            Polarity::Negative => negative.push(comment),
        }
    }

    let positive_keywords = keywords::extract(&positive.join(" "));
    let negative_keywords = keywords::extract(&negative.join(" "));

    tracing::debug!(
        positive = positive.len(),
        negative = negative.len(),
        "heuristic classification complete"
    );

    Classification {
        positive_count: positive.len(),
        negative_count: negative.len(),
        positive_summary: vec![
            "Users highlight aspects of the product that work well for them.".to_string(),
            themes_sentence("positive", &positive_keywords),
        ],
        negative_summary: vec![
            "Users report friction points that need attention.".to_string(),
            themes_sentence("negative", &negative_keywords),
        ],
        positive_keywords,
        negative_keywords,
    }
}

fn themes_sentence(label: &str, keywords: &[String]) -> String {
    let themes = if keywords.is_empty() {
        "none".to_string()
    } else {
        keywords
            .iter()
            .take(SUMMARY_THEMES)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!("Top {label} themes: {themes}.")
}
