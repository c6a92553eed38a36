//! Speech-synthesis collaborator implementations and the spoken-pacing
//! estimate used when synthesis is unavailable.

mod pacing;
mod synth;

pub use pacing::spoken_duration;
pub use synth::{HttpSynthesizer, MockSynthesizer, TextOnlySynthesizer, TtsConfig};
