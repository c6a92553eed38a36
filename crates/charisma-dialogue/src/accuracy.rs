use std::collections::HashSet;

use crate::text::{contains_any, padded, words};

/// Below this many words a repeat-back cannot carry the content of a
/// full statement.
const MIN_WORD_COUNT: usize = 3;

/// A word repeated this many times in a row is noise, not speech.
const MAX_REPEAT_RUN: usize = 3;

/// Fraction of the original's concept tokens that must survive into the
/// candidate.
const MIN_OVERLAP: f64 = 0.6;

const NONSENSE_TOKENS: &[&str] = &["blah", "asdf", "lorem", "ipsum", "qwerty"];

const TRAILING_CONJUNCTIONS: &[&str] = &[
    "and", "but", "or", "so", "because", "however", "although", "while", "though",
];

const TRAILING_PREPOSITIONS: &[&str] = &[
    "with", "to", "for", "in", "on", "at", "by", "from", "about", "of", "up", "out",
];

const HEDGING_PHRASES: &[&str] = &["i think", "maybe", "perhaps", "possibly", "i guess", "i suppose"];

/// Markers showing the candidate actually shifted perspective instead of
/// parroting.
const PERSPECTIVE_MARKERS: &[&str] = &[
    "you said",
    "you feel",
    "you think",
    "you want",
    "you need",
    "you believe",
    "you mentioned",
    "you told",
    "you're",
    "you are",
    "you've",
    "you have",
];

const STOP_WORDS: &[&str] = &[
    "i", "me", "my", "mine", "you", "your", "yours", "we", "us", "our", "it", "its", "the", "a",
    "an", "and", "or", "but", "so", "that", "this", "those", "these", "is", "are", "was", "were",
    "be", "been", "being", "am", "do", "does", "did", "have", "has", "had", "to", "of", "in", "on",
    "at", "for", "with", "about", "as", "by", "from", "up", "down", "out", "very", "really",
    "just", "not", "no", "yes", "im", "i'm", "you're", "don't", "feel", "think", "said", "saying",
];

/// Did the reply restate enough of the original statement? Gate order:
/// length, nonsense, truncation, perspective shift, then token overlap.
pub fn score_paraphrase_accuracy(original: &str, candidate: &str) -> bool {
    let candidate_words = words(candidate);

    if candidate_words.len() < MIN_WORD_COUNT {
        return false;
    }
    if has_repeated_run(&candidate_words) {
        return false;
    }
    if candidate_words.iter().any(|w| NONSENSE_TOKENS.contains(&w.as_str())) {
        return false;
    }
    if is_incomplete_input(candidate) {
        return false;
    }
    if !contains_any(&padded(candidate), PERSPECTIVE_MARKERS) {
        return false;
    }

    let concepts = concept_tokens(original);
    if concepts.is_empty() {
        // Nothing substantive to compare against; the gates above have
        // already filtered the obvious junk.
        return true;
    }

    let candidate_set: HashSet<String> = candidate_words.into_iter().collect();
    let matched = concepts.iter().filter(|c| candidate_set.contains(*c)).count();
    (matched as f64 / concepts.len() as f64) >= MIN_OVERLAP
}

/// Does the text look cut off or too vague to act on? Mirrors the gate
/// applied to topic answers and repeat-backs alike.
pub fn is_incomplete_input(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return true;
    }

    let tokens = words(trimmed);
    let Some(last) = tokens.last() else {
        return true;
    };

    if TRAILING_CONJUNCTIONS.contains(&last.as_str())
        || TRAILING_PREPOSITIONS.contains(&last.as_str())
    {
        return true;
    }

    // A hedge with nothing after it ("i think", "maybe so") is not an answer.
    let hay = padded(trimmed);
    if tokens.len() <= 3 && contains_any(&hay, HEDGING_PHRASES) {
        return true;
    }

    if tokens.len() <= 2 && !trimmed.ends_with(['.', '!', '?']) {
        return true;
    }

    false
}

/// Distinct stop-word-filtered tokens of the original statement.
fn concept_tokens(text: &str) -> HashSet<String> {
    words(text)
        .into_iter()
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

fn has_repeated_run(tokens: &[String]) -> bool {
    let mut run = 1;
    for pair in tokens.windows(2) {
        if pair[0] == pair[1] {
            run += 1;
            if run >= MAX_REPEAT_RUN {
                return true;
            }
        } else {
            run = 1;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGINAL: &str =
        "I feel overwhelmed by work stress lately, and I want us to find a better balance.";

    #[test]
    fn faithful_restatement_accepted() {
        assert!(score_paraphrase_accuracy(
            ORIGINAL,
            "You said you feel overwhelmed by work stress lately and you want a better balance."
        ));
    }

    #[test]
    fn repeated_nonsense_words_rejected() {
        assert!(!score_paraphrase_accuracy(ORIGINAL, "bananas bananas bananas"));
    }

    #[test]
    fn too_short_rejected() {
        assert!(!score_paraphrase_accuracy(ORIGINAL, "you feel"));
    }

    #[test]
    fn filler_tokens_rejected() {
        assert!(!score_paraphrase_accuracy(ORIGINAL, "you said blah blah work stress balance"));
    }

    #[test]
    fn truncated_reply_rejected() {
        assert!(!score_paraphrase_accuracy(ORIGINAL, "you said you feel overwhelmed by"));
    }

    #[test]
    fn missing_perspective_shift_rejected() {
        assert!(!score_paraphrase_accuracy(
            ORIGINAL,
            "overwhelmed work stress balance lately something"
        ));
    }

    #[test]
    fn low_overlap_rejected() {
        assert!(!score_paraphrase_accuracy(
            ORIGINAL,
            "you said the weather has been lovely this spring season"
        ));
    }

    #[test]
    fn incomplete_input_detection() {
        assert!(is_incomplete_input("I think you should be more patient and"));
        assert!(!is_incomplete_input("I think you should be more patient."));
        assert!(is_incomplete_input("Maybe we could"));
        assert!(!is_incomplete_input("Let's try to communicate better."));
        assert!(is_incomplete_input("I think"));
        assert!(is_incomplete_input("I'm not sure about"));
        assert!(is_incomplete_input(""));
        assert!(is_incomplete_input("ok then"));
    }
}
