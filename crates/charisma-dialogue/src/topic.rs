use crate::accuracy::is_incomplete_input;
use crate::text::{contains_any, padded, words};

/// Used when the user never lands on a workable issue.
pub const DEFAULT_TOPIC: &str = "balancing work and personal time";

/// Non-answers that cannot anchor a conversation.
const VAGUE_ANSWERS: &[&str] = &[
    "i don't know",
    "dunno",
    "anything",
    "whatever",
    "nothing",
    "no idea",
    "you choose",
    "you pick",
    "not sure",
    "doesn't matter",
];

/// Is this answer specific enough to become the session topic?
pub fn is_usable_topic(text: &str) -> bool {
    let tokens = words(text);
    if tokens.len() < 2 {
        return false;
    }
    if contains_any(&padded(text), VAGUE_ANSWERS) {
        return false;
    }
    !is_incomplete_input(text)
}
