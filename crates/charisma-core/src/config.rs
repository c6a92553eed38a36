use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The bot's personality tag, chosen by the client at session creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Character {
    Optimistic,
    Neutral,
    Pessimistic,
}

impl Character {
    /// Tone phrase woven into generation prompts.
    pub fn tone(&self) -> &'static str {
        match self {
            Self::Optimistic => "positive and encouraging",
            Self::Neutral => "balanced and objective",
            Self::Pessimistic => "realistic but not overly negative",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Optimistic => "optimistic",
            Self::Neutral => "neutral",
            Self::Pessimistic => "pessimistic",
        }
    }
}

impl Default for Character {
    fn default() -> Self {
        Self::Neutral
    }
}

impl std::str::FromStr for Character {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "optimistic" => Ok(Self::Optimistic),
            "neutral" => Ok(Self::Neutral),
            "pessimistic" => Ok(Self::Pessimistic),
            other => Err(format!("unknown character: {other}")),
        }
    }
}

impl std::fmt::Display for Character {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-session tunables. The round thresholds and the inter-turn pause are
/// deliberately configuration, not behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    pub character: Character,
    /// Rounds each role must complete before problem solving begins.
    pub min_rounds_per_role: u32,
    /// Hard cap on total rounds; exceeding it terminates the session.
    pub max_total_rounds: u32,
    /// Natural pause inserted between consecutive bot turns.
    #[serde(with = "duration_millis")]
    pub inter_turn_pause: Duration,
}

impl SessionConfig {
    pub fn with_character(character: Character) -> Self {
        Self {
            character,
            ..Self::default()
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            character: Character::Neutral,
            min_rounds_per_role: 1,
            max_total_rounds: 5,
            inter_turn_pause: Duration::from_millis(700),
        }
    }
}

mod duration_millis {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = <u64 as serde::Deserialize>::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}
