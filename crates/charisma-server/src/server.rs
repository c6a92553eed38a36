use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use charisma_core::config::{Character, SessionConfig};
use charisma_core::ids::SessionId;
use charisma_relay::RoomRegistry;
use charisma_session::SessionSupervisor;

use crate::client;

/// Server configuration.
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 5000 }
    }
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub supervisor: Arc<SessionSupervisor>,
    pub relay: Arc<RoomRegistry>,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/session", post(create_session_handler))
        .route("/session/{session_id}", delete(end_session_handler))
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Create and start the server. Returns a handle that keeps it alive.
pub async fn start(config: ServerConfig, state: AppState) -> Result<ServerHandle, std::io::Error> {
    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(port = local_addr.port(), "charisma server started");

    let server = tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        _server: server,
    })
}

/// Handle returned by `start()` — dropping it does not stop the server,
/// but it carries the bound port for callers that asked for port 0.
pub struct ServerHandle {
    pub port: u16,
    _server: tokio::task::JoinHandle<()>,
}

#[derive(Debug, Deserialize)]
struct CreateSessionRequest {
    character: Option<Character>,
}

async fn create_session_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> impl IntoResponse {
    let config = SessionConfig::with_character(request.character.unwrap_or_default());
    match state.supervisor.create_session(config) {
        Ok(session_id) => (
            StatusCode::OK,
            Json(serde_json::json!({ "session_id": session_id })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "session creation failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
        }
    }
}

/// Idempotent: ending an unknown or already-ended session succeeds.
async fn end_session_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    state.supervisor.end_session(&SessionId::from_raw(session_id)).await;
    StatusCode::NO_CONTENT
}

#[derive(Debug, Deserialize)]
struct WsQuery {
    session_id: String,
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let session_id = SessionId::from_raw(query.session_id);
    ws.on_upgrade(move |socket| client::handle_socket(socket, session_id, state))
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "sessions": state.supervisor.session_count(),
        "rooms": state.relay.room_count(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use charisma_dialogue::emotion::KeywordEmotionTagger;
    use charisma_dialogue::generate::TemplateGenerator;
    use charisma_session::{BridgeConfig, SupervisorConfig};
    use charisma_speech::MockSynthesizer;
    use charisma_store::{Database, SnapshotRepo};

    fn test_state() -> AppState {
        let relay = Arc::new(RoomRegistry::new(64));
        let db = Database::in_memory().unwrap();
        let config = SupervisorConfig {
            shutdown_grace: Duration::from_millis(200),
            bridge: BridgeConfig {
                speak_timeout: Duration::from_millis(100),
                listen_attempt_timeout: Duration::from_millis(200),
                listen_attempts: 1,
                keepalive_interval: Duration::from_millis(50),
            },
            ..Default::default()
        };
        let supervisor = Arc::new(SessionSupervisor::new(
            Arc::clone(&relay),
            Some(SnapshotRepo::new(db)),
            Arc::new(TemplateGenerator),
            Arc::new(KeywordEmotionTagger),
            Arc::new(MockSynthesizer::failing()),
            config,
        ));
        AppState { supervisor, relay }
    }

    #[test]
    fn build_router_creates_routes() {
        let _router = build_router(test_state());
    }

    #[tokio::test]
    async fn health_endpoint_reports_counts() {
        let state = test_state();
        let handle = start(ServerConfig { port: 0 }, state).await.unwrap();

        let url = format!("http://127.0.0.1:{}/health", handle.port);
        let response = reqwest::get(&url).await.unwrap();
        assert_eq!(response.status(), 200);

        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["sessions"], 0);
    }

    #[tokio::test]
    async fn create_then_end_session_over_http() {
        let state = test_state();
        let supervisor = Arc::clone(&state.supervisor);
        let handle = start(ServerConfig { port: 0 }, state).await.unwrap();
        let base = format!("http://127.0.0.1:{}", handle.port);
        let http = reqwest::Client::new();

        let response = http
            .post(format!("{base}/session"))
            .json(&serde_json::json!({ "character": "optimistic" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let body: serde_json::Value = response.json().await.unwrap();
        let session_id = body["session_id"].as_str().unwrap().to_string();
        assert!(session_id.starts_with("sess_"));
        assert_eq!(supervisor.session_count(), 1);

        let response = http
            .delete(format!("{base}/session/{session_id}"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 204);
        assert_eq!(supervisor.session_count(), 0);

        // Ending again, and ending nonsense, both succeed.
        let response = http
            .delete(format!("{base}/session/{session_id}"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 204);
        let response = http
            .delete(format!("{base}/session/not-a-session"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 204);
    }

    #[tokio::test]
    async fn create_session_failure_maps_to_unavailable() {
        let mut state = test_state();
        let relay = Arc::clone(&state.relay);
        let db = Database::in_memory().unwrap();
        state.supervisor = Arc::new(SessionSupervisor::new(
            relay,
            Some(SnapshotRepo::new(db)),
            Arc::new(TemplateGenerator),
            Arc::new(KeywordEmotionTagger),
            Arc::new(MockSynthesizer::failing()),
            SupervisorConfig {
                max_sessions: 0,
                ..Default::default()
            },
        ));
        let handle = start(ServerConfig { port: 0 }, state).await.unwrap();

        let response = reqwest::Client::new()
            .post(format!("http://127.0.0.1:{}/session", handle.port))
            .json(&serde_json::json!({}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 503);
    }
}
