use charisma_core::collab::EmotionTagger;

use crate::text::{contains_any, padded};

/// Keyword-list emotion tagger. Deliberately shallow: the tag decorates
/// transcript entries and tilts empathetic replies, nothing more.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeywordEmotionTagger;

const EMOTION_KEYWORDS: &[(&str, &[&str])] = &[
    ("happy", &["happy", "joy", "excited", "great", "wonderful", "love", "glad"]),
    ("sad", &["sad", "unhappy", "depressed", "down", "hurt", "pain"]),
    ("angry", &["angry", "mad", "frustrated", "annoyed", "upset"]),
    ("anxious", &["worried", "anxious", "nervous", "scared", "afraid"]),
];

impl EmotionTagger for KeywordEmotionTagger {
    fn tag(&self, text: &str) -> String {
        let hay = padded(text);
        for (emotion, keywords) in EMOTION_KEYWORDS {
            if contains_any(&hay, keywords) {
                return (*emotion).to_string();
            }
        }
        "neutral".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_hits() {
        let tagger = KeywordEmotionTagger;
        assert_eq!(tagger.tag("I am so happy today"), "happy");
        assert_eq!(tagger.tag("this makes me frustrated"), "angry");
        assert_eq!(tagger.tag("I'm worried about tomorrow"), "anxious");
    }

    #[test]
    fn defaults_to_neutral() {
        let tagger = KeywordEmotionTagger;
        assert_eq!(tagger.tag("the meeting is at noon"), "neutral");
        assert_eq!(tagger.tag(""), "neutral");
    }
}
