//! Frequency-ranked keyword extraction for free-text feedback

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// Longest keyword list any insight carries
pub const MAX_KEYWORDS: usize = 8;
const MIN_TOKEN_LEN: usize = 4;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9_\s]").unwrap());

/// Articles, pronouns, prepositions and auxiliary verbs
static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // Articles / determiners
        "a", "an", "the", "this", "that", "these", "those", "some", "such", "each", "every",
        "other", "another", "there", "here",
        // Pronouns
        "i", "me", "my", "mine", "you", "your", "yours", "he", "him", "his", "she", "her",
        "hers", "it", "its", "we", "us", "our", "ours", "they", "them", "their", "theirs",
        "what", "which", "who", "whom", "whose", "itself", "myself", "yourself", "ourselves",
        "themselves",
        // Prepositions / conjunctions
        "about", "above", "across", "after", "against", "along", "among", "around", "before",
        "behind", "below", "beneath", "beside", "between", "beyond", "during", "from", "into",
        "onto", "over", "through", "throughout", "toward", "towards", "under", "until", "upon",
        "with", "within", "without", "and", "but", "for", "nor", "yet", "than", "then", "when",
        "where", "while", "because", "since", "though", "although", "also", "just", "very",
        "more", "most", "only",
        // Auxiliary verbs
        "am", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
        "having", "do", "does", "did", "doing", "will", "would", "shall", "should", "can",
        "could", "may", "might", "must",
    ]
    .into_iter()
    .collect()
});

/// True for words excluded from keyword lists
pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(token)
}

/// Extract up to [`MAX_KEYWORDS`] salient terms from `text`.
///
/// Terms are ranked by frequency, ties keep the order in which the term first
/// appeared. Empty input yields an empty list.
pub fn extract(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let cleaned = NON_WORD.replace_all(&lowered, "");

    // first-seen order is the position in `order`
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for token in cleaned.split_whitespace() {
        if token.len() < MIN_TOKEN_LEN || is_stop_word(token) {
            continue;
        }
        let count = counts.entry(token).or_insert(0);
        if *count == 0 {
            order.push(token);
        }
        *count += 1;
    }

    // sort_by is stable, so equal counts stay in first-seen order
    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    order
        .into_iter()
        .take(MAX_KEYWORDS)
        .map(str::to_string)
        .collect()
}
