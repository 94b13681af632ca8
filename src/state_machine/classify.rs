//! Input normalization and reply classification
//!
//! The token lists below are the single source of truth for which phrases
//! count as "yes" or "no". Matching is substring-based and expects text that
//! already went through [`normalize_text`], so "sí, quiero" and "yes please"
//! both classify as affirmative.

/// Tokens that make an informational-state reply affirmative
const AFFIRMATIVE_TOKENS: &[&str] = &["sí", "si", "yes"];

/// Tokens that end the advisor hand-off
const DECLINE_TOKENS: &[&str] = &["no", "nop"];

/// Classified answer to a Sí/No question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Affirmative,
    /// Anything that is not affirmative, including free text
    Other,
}

/// Trim surrounding whitespace and lower-case.
pub fn normalize_text(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn classify_reply(text: &str) -> Reply {
    if contains_any(text, AFFIRMATIVE_TOKENS) {
        Reply::Affirmative
    } else {
        Reply::Other
    }
}

pub fn is_decline(text: &str) -> bool {
    contains_any(text, DECLINE_TOKENS)
}

fn contains_any(text: &str, tokens: &[&str]) -> bool {
    tokens.iter().any(|token| text.contains(token))
}
