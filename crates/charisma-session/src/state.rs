use chrono::Utc;

use charisma_core::config::Character;
use charisma_core::ids::SessionId;
use charisma_core::roles::{Role, Sender};
use charisma_core::transcript::{ConversationSnapshot, TranscriptEntry};

/// Mutable conversation state, owned exclusively by its worker. Only the
/// worker's single control flow ever touches it; everyone else sees the
/// read-only snapshot exported at termination.
pub struct ConversationState {
    session_id: SessionId,
    character: Character,
    bot_role: Role,
    topic: String,
    transcript: Vec<TranscriptEntry>,
    bot_messages: u32,
    user_messages: u32,
    speaker_rounds_completed: u32,
    listener_rounds_completed: u32,
    total_rounds: u32,
    terminated: bool,
}

impl ConversationState {
    pub fn new(session_id: SessionId, character: Character) -> Self {
        Self {
            session_id,
            character,
            // The bot opens as speaker; the user starts listening.
            bot_role: Role::Speaker,
            topic: String::new(),
            transcript: Vec::new(),
            bot_messages: 0,
            user_messages: 0,
            speaker_rounds_completed: 0,
            listener_rounds_completed: 0,
            total_rounds: 0,
            terminated: false,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn character(&self) -> Character {
        self.character
    }

    pub fn bot_role(&self) -> Role {
        self.bot_role
    }

    pub fn user_role(&self) -> Role {
        self.bot_role.flip()
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn set_topic(&mut self, topic: impl Into<String>) {
        self.topic = topic.into();
    }

    pub fn record_bot(&mut self, text: &str, emotion: &str) {
        self.bot_messages += 1;
        self.push_entry(Sender::Bot, text, emotion);
    }

    pub fn record_user(&mut self, text: &str, emotion: &str) {
        self.user_messages += 1;
        self.push_entry(Sender::User, text, emotion);
    }

    fn push_entry(&mut self, sender: Sender, text: &str, emotion: &str) {
        self.transcript.push(TranscriptEntry {
            sender,
            text: text.to_string(),
            emotion: emotion.to_string(),
            round: self.total_rounds,
            timestamp: Utc::now(),
        });
    }

    /// Credit the just-finished round to the bot's current role.
    pub fn complete_round(&mut self) {
        match self.bot_role {
            Role::Speaker => self.speaker_rounds_completed += 1,
            Role::Listener => self.listener_rounds_completed += 1,
        }
        self.total_rounds += 1;
    }

    /// Flip the role assignment; returns the bot's new role.
    pub fn switch_roles(&mut self) -> Role {
        self.bot_role = self.bot_role.flip();
        self.bot_role
    }

    pub fn both_roles_completed(&self, min_rounds: u32) -> bool {
        self.speaker_rounds_completed >= min_rounds && self.listener_rounds_completed >= min_rounds
    }

    pub fn round_cap_reached(&self, max_total: u32) -> bool {
        self.total_rounds >= max_total
    }

    pub fn total_rounds(&self) -> u32 {
        self.total_rounds
    }

    pub fn terminate(&mut self) {
        self.terminated = true;
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Read-only export for persistence.
    pub fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            session_id: self.session_id.clone(),
            character: self.character,
            topic: self.topic.clone(),
            transcript: self.transcript.clone(),
            bot_messages: self.bot_messages,
            user_messages: self.user_messages,
            speaker_rounds_completed: self.speaker_rounds_completed,
            listener_rounds_completed: self.listener_rounds_completed,
            total_rounds: self.total_rounds,
            finished_at: Utc::now(),
        }
    }
}
