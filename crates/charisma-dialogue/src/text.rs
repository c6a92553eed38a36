//! Shared tokenization helpers for the text heuristics.

/// Lowercase, strip punctuation, split on whitespace.
pub(crate) fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphanumeric() || *c == '\'')
                .collect::<String>()
        })
        .filter(|w| !w.is_empty())
        .collect()
}

/// Normalized text padded with spaces so phrase lookups can match on
/// word boundaries ("no" must not match inside "know").
pub(crate) fn padded(text: &str) -> String {
    format!(" {} ", words(text).join(" "))
}

pub(crate) fn contains_phrase(haystack_padded: &str, phrase: &str) -> bool {
    haystack_padded.contains(&format!(" {phrase} "))
}

pub(crate) fn contains_any(haystack_padded: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| contains_phrase(haystack_padded, p))
}
