//! Keyword-based intent classification and request parsing helpers.

use crate::agent::types::Intent;
use once_cell::sync::Lazy;
use regex::Regex;

const SHOPPING_KEYWORDS: &[&str] = &[
    "best", "buy", "purchase", "price", "cheap", "expensive", "under", "rupees", "dollars",
    "shoes", "phone", "laptop", "product", "compare", "review", "rating", "deals",
];

const NAVIGATION_KEYWORDS: &[&str] = &["go to", "navigate to", "visit", "open"];

const QUESTION_KEYWORDS: &[&str] = &["what is", "who is", "how does", "why does", "tell me about"];

const SEARCH_KEYWORDS: &[&str] = &["search for", "find", "look up", "research"];

/// Checked before the generic domain pattern
const KNOWN_DOMAINS: &[&str] = &["google.com", "wikipedia.org", "example.com", "github.com"];

static DOMAIN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-zA-Z0-9-]+\.(?:com|org|net|edu|gov))").expect("valid regex"));

static SEARCH_PHRASES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:search\s+for|find)\b").expect("valid regex"));

/// Classify a request; the first matching keyword set wins.
pub fn classify(text: &str) -> Intent {
    let text = text.trim().to_lowercase();
    let matches = |keywords: &[&str]| keywords.iter().any(|k| text.contains(k));

    if matches(SHOPPING_KEYWORDS) {
        Intent::Shopping
    } else if matches(NAVIGATION_KEYWORDS) {
        Intent::Navigation
    } else if matches(QUESTION_KEYWORDS) {
        Intent::Question
    } else if matches(SEARCH_KEYWORDS) {
        Intent::Search
    } else {
        Intent::General
    }
}

/// Domain to open for a navigation request
pub fn extract_target_domain(text: &str) -> Option<String> {
    let lowered = text.to_lowercase();
    if let Some(domain) = KNOWN_DOMAINS.iter().find(|d| lowered.contains(*d)) {
        return Some(domain.to_string());
    }

    DOMAIN_PATTERN
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Question text with the question phrases removed
pub fn question_topic(text: &str) -> String {
    let mut topic = text.to_lowercase();
    for prefix in QUESTION_KEYWORDS {
        topic = topic.replace(prefix, "");
    }
    topic.trim().to_string()
}

/// Query for a search request: "search for" and "find" removed
pub fn search_terms(text: &str) -> String {
    let stripped = SEARCH_PHRASES.replace_all(text, "");
    let terms = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    if terms.is_empty() {
        text.trim().to_string()
    } else {
        terms
    }
}
