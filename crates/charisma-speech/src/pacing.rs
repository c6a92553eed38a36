use std::time::Duration;

/// Conversational speech runs around 150 words per minute; 400 ms per
/// word is a comfortable upper-side estimate for short bot turns.
const MILLIS_PER_WORD: u64 = 400;
const MIN_PAUSE: Duration = Duration::from_millis(800);
const MAX_PAUSE: Duration = Duration::from_secs(12);

/// How long the bot would plausibly take to say `text` aloud. Used to
/// pace the conversation when audio could not be synthesized, so
/// text-only sessions still read at a human rhythm.
pub fn spoken_duration(text: &str) -> Duration {
    let word_count = text.split_whitespace().count() as u64;
    Duration::from_millis(word_count * MILLIS_PER_WORD).clamp(MIN_PAUSE, MAX_PAUSE)
}
