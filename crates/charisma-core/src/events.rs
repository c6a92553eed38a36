use serde::{Deserialize, Serialize};

use crate::ids::SessionId;
use crate::roles::Sender;

/// A room-scoped event: the session id names the room, the payload is a
/// closed tagged union validated at the relay boundary. Arbitrary shapes
/// never cross the wire.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoomEvent {
    pub session_id: SessionId,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl RoomEvent {
    pub fn new(session_id: SessionId, payload: EventPayload) -> Self {
        Self { session_id, payload }
    }
}

/// Whether an event steers the protocol or carries conversation content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventPlane {
    Control,
    Data,
}

/// Every event that may cross a room. Field sets are fixed per variant.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// Worker toggles the client microphone; also re-sent as a keepalive
    /// during long listen windows.
    MicActivated { activated: bool },

    /// A transcript line, from either side.
    NewMessage { text: String, sender: Sender },

    /// Synthesized audio for the client to play.
    PlayAudio { audio_b64: String, mime: String },

    /// Synthesis failed; the message arrives as text only.
    TtsFailed { message: String },

    /// Transcribed user speech.
    UserInput { text: String },

    /// Client finished playing the bot's audio.
    BotAudioEnded {},

    /// Sent to a client when it joins its room.
    SessionAssigned {},

    /// The session's worker is gone; the room is closing.
    SessionEnded {},
}

impl EventPayload {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::MicActivated { .. } => "mic_activated",
            Self::NewMessage { .. } => "new_message",
            Self::PlayAudio { .. } => "play_audio",
            Self::TtsFailed { .. } => "tts_failed",
            Self::UserInput { .. } => "user_input",
            Self::BotAudioEnded {} => "bot_audio_ended",
            Self::SessionAssigned {} => "session_assigned",
            Self::SessionEnded {} => "session_ended",
        }
    }

    pub fn plane(&self) -> EventPlane {
        match self {
            Self::MicActivated { .. }
            | Self::BotAudioEnded {}
            | Self::SessionAssigned {}
            | Self::SessionEnded {} => EventPlane::Control,
            Self::NewMessage { .. }
            | Self::PlayAudio { .. }
            | Self::TtsFailed { .. }
            | Self::UserInput { .. } => EventPlane::Data,
        }
    }

    /// Payloads a browser client may originate. Everything else is
    /// worker- or relay-originated and dropped if a client sends it.
    pub fn client_publishable(&self) -> bool {
        matches!(
            self,
            Self::UserInput { .. }
                | Self::BotAudioEnded {}
                | Self::MicActivated { .. }
                | Self::NewMessage { .. }
        )
    }
}
