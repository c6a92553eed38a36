//! HTTP + WebSocket surface: session creation and teardown on the
//! control plane, and the WebSocket leg that wires a browser client
//! into its session's relay room.

mod client;
mod server;

pub use server::{build_router, start, AppState, ServerConfig, ServerHandle};
