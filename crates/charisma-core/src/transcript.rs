use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Character;
use crate::ids::SessionId;
use crate::roles::Sender;

/// One line of the conversation as the worker records it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub sender: Sender,
    pub text: String,
    pub emotion: String,
    pub round: u32,
    pub timestamp: DateTime<Utc>,
}

/// Read-only export of a finished (or finishing) conversation, persisted
/// once at termination.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    pub session_id: SessionId,
    pub character: Character,
    pub topic: String,
    pub transcript: Vec<TranscriptEntry>,
    pub bot_messages: u32,
    pub user_messages: u32,
    pub speaker_rounds_completed: u32,
    pub listener_rounds_completed: u32,
    pub total_rounds: u32,
    pub finished_at: DateTime<Utc>,
}

impl ConversationSnapshot {
    pub fn message_count(&self) -> u32 {
        self.bot_messages + self.user_messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> ConversationSnapshot {
        ConversationSnapshot {
            session_id: SessionId::new(),
            character: Character::Neutral,
            topic: "work stress".into(),
            transcript: vec![TranscriptEntry {
                sender: Sender::Bot,
                text: "hello".into(),
                emotion: "neutral".into(),
                round: 0,
                timestamp: Utc::now(),
            }],
            bot_messages: 3,
            user_messages: 2,
            speaker_rounds_completed: 1,
            listener_rounds_completed: 1,
            total_rounds: 2,
            finished_at: Utc::now(),
        }
    }

    #[test]
    fn message_count_sums_both_sides() {
        assert_eq!(snapshot().message_count(), 5);
    }

    #[test]
    fn snapshot_serde_roundtrip() {
        let snap = snapshot();
        let json = serde_json::to_string(&snap).unwrap();
        let parsed: ConversationSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.topic, "work stress");
        assert_eq!(parsed.transcript.len(), 1);
        assert_eq!(parsed.transcript[0].sender, Sender::Bot);
    }
}
