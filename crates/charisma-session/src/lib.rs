//! Per-session conversation machinery: the synchronous bridge over the
//! relay, the turn-taking state machine, and the supervisor that owns
//! one worker task per live session.

pub mod bridge;
pub mod machine;
pub mod state;
pub mod supervisor;

mod error;

pub use bridge::{BridgeConfig, SessionBridge, SpeakOutcome};
pub use error::SessionError;
pub use machine::ConversationMachine;
pub use state::ConversationState;
pub use supervisor::{SessionSupervisor, SupervisorConfig};
