use std::collections::HashSet;

use crate::text::{contains_any, padded};

/// Words suggesting the user's suggestion is rooted in difficulty rather
/// than neutral planning. Steers the closing reply toward empathy.
const HARDSHIP_INDICATORS: &[&str] = &[
    "difficult", "hard", "struggle", "struggling", "challenging", "tough",
    "worried", "anxious", "scared", "afraid", "nervous",
    "sad", "depressed", "unhappy", "hurt", "pain",
    "frustrated", "angry", "upset", "mad", "annoyed",
];

pub fn detect_hardship(text: &str) -> bool {
    contains_any(&padded(text), HARDSHIP_INDICATORS)
}

/// Coarse themes recognized in a collaborative suggestion; used to pick
/// a canned reply when no generator is available.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Theme {
    Communication,
    Understanding,
    Improvement,
}

pub fn extract_themes(text: &str) -> HashSet<Theme> {
    const THEME_KEYWORDS: &[(Theme, &[&str])] = &[
        (Theme::Communication, &["talk", "speak", "listen", "share", "communicate"]),
        (Theme::Understanding, &["understand", "learn", "know", "realize"]),
        (Theme::Improvement, &["better", "improve", "change", "grow", "develop"]),
    ];

    let hay = padded(text);
    THEME_KEYWORDS
        .iter()
        .filter(|(_, keywords)| contains_any(&hay, keywords))
        .map(|(theme, _)| *theme)
        .collect()
}
