use crate::text::{contains_any, padded};

/// Tri-state outcome of asking "did I understand you correctly?".
/// Ambiguity is a first-class result, not an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Confirmation {
    Affirmative,
    Negative,
    Ambiguous,
}

const AFFIRMATIVE_PHRASES: &[&str] = &[
    "yes",
    "yeah",
    "yep",
    "correct",
    "right",
    "exactly",
    "affirmative",
    "indeed",
    "that is correct",
    "that's right",
    "you got it",
];

const NEGATIVE_PHRASES: &[&str] = &[
    "no",
    "nope",
    "incorrect",
    "wrong",
    "not quite",
    "not really",
    "not exactly",
    "that's not it",
];

/// Phrases that signal the user is correcting the bot. A correction is
/// never a confirmation, whatever else the sentence contains.
const CORRECTION_MARKERS: &[&str] = &[
    "but you should",
    "you should have",
    "you missed",
    "you forgot",
    "that's not what i said",
    "not what i said",
    "actually i said",
    "what i actually said",
];

const GOODBYE_PHRASES: &[&str] = &["goodbye", "bye", "ok bye", "exit", "quit"];

/// Did the user say goodbye? Terminates the session from any state.
pub fn is_goodbye(text: &str) -> bool {
    contains_any(&padded(text), GOODBYE_PHRASES)
}

/// Classify a confirmation reply against the phrase lists. Correction
/// markers force `Negative` even alongside affirmative tokens; mixed
/// signals without a correction marker are `Ambiguous`, as is a reply
/// matching neither list.
pub fn classify_confirmation(text: &str) -> Confirmation {
    let hay = padded(text);

    if contains_any(&hay, CORRECTION_MARKERS) {
        return Confirmation::Negative;
    }

    let affirmative = contains_any(&hay, AFFIRMATIVE_PHRASES);
    let negative = contains_any(&hay, NEGATIVE_PHRASES);

    match (affirmative, negative) {
        (true, false) => Confirmation::Affirmative,
        (false, true) => Confirmation::Negative,
        _ => Confirmation::Ambiguous,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_yes_is_affirmative() {
        assert_eq!(classify_confirmation("yes"), Confirmation::Affirmative);
        assert_eq!(classify_confirmation("Yes, exactly."), Confirmation::Affirmative);
        assert_eq!(classify_confirmation("that is correct"), Confirmation::Affirmative);
    }

    #[test]
    fn plain_no_is_negative() {
        assert_eq!(classify_confirmation("no"), Confirmation::Negative);
        assert_eq!(classify_confirmation("Nope, not quite."), Confirmation::Negative);
    }

    #[test]
    fn mixed_signals_are_ambiguous() {
        assert_eq!(classify_confirmation("yes and no"), Confirmation::Ambiguous);
        assert_eq!(classify_confirmation("well yes but also no"), Confirmation::Ambiguous);
    }

    #[test]
    fn correction_overrides_affirmative_tokens() {
        assert_eq!(
            classify_confirmation("yes but you should have explained more"),
            Confirmation::Negative
        );
        assert_eq!(
            classify_confirmation("right, but that's not what i said"),
            Confirmation::Negative
        );
    }

    #[test]
    fn unrelated_text_is_ambiguous() {
        assert_eq!(classify_confirmation("bananas"), Confirmation::Ambiguous);
        assert_eq!(classify_confirmation(""), Confirmation::Ambiguous);
    }

    #[test]
    fn goodbye_detection() {
        assert!(is_goodbye("ok bye now"));
        assert!(is_goodbye("Goodbye!"));
        assert!(is_goodbye("quit"));
        assert!(!is_goodbye("let's talk about my goodbyes"));
        assert!(!is_goodbye("yes"));
    }

    #[test]
    fn negation_does_not_match_inside_words() {
        // "know" must not be read as "no"
        assert_eq!(classify_confirmation("yes, i know"), Confirmation::Affirmative);
    }
}
