use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures::{SinkExt, StreamExt};

use charisma_core::events::{EventPayload, RoomEvent};
use charisma_core::ids::SessionId;

use crate::server::AppState;

/// Wire a browser client into its session's room: outbound room events
/// serialize onto the socket, inbound frames are validated and
/// published, and disconnect marks the session inactive without killing
/// its worker.
pub async fn handle_socket(socket: WebSocket, session_id: SessionId, state: AppState) {
    let mut subscription = state.relay.join(&session_id);
    let peer_id = subscription.peer_id.clone();
    state.supervisor.mark_connected(&session_id);
    tracing::info!(session_id = %session_id, peer_id = %peer_id, "client connected");

    state.relay.publish(RoomEvent::new(
        session_id.clone(),
        EventPayload::SessionAssigned {},
    ));

    let (mut ws_tx, mut ws_rx) = socket.split();

    // Writer: room events out to the socket.
    let writer_session = session_id.clone();
    let writer = tokio::spawn(async move {
        while let Some(event) = subscription.receiver.recv().await {
            let closing = matches!(event.payload, EventPayload::SessionEnded {});
            match serde_json::to_string(&event) {
                Ok(json) => {
                    if ws_tx.send(WsMessage::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(session_id = %writer_session, error = %e, "event serialization failed");
                }
            }
            if closing {
                let _ = ws_tx.send(WsMessage::Close(None)).await;
                break;
            }
        }
    });

    // Reader: socket frames in, validated at the relay boundary.
    let reader_state = state.clone();
    let reader_session = session_id.clone();
    let reader = tokio::spawn(async move {
        while let Some(Ok(message)) = ws_rx.next().await {
            match message {
                WsMessage::Text(text) => {
                    if let Some(event) = parse_client_event(&reader_session, text.as_str()) {
                        reader_state.relay.publish(event);
                    }
                }
                WsMessage::Close(_) => break,
                // axum answers pings itself
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = writer => {},
        _ = reader => {},
    }

    state.relay.leave(&session_id, &peer_id);
    state.supervisor.mark_disconnected(&session_id);
    tracing::info!(session_id = %session_id, peer_id = %peer_id, "client disconnected");
}

/// Validate an inbound frame: it must parse as a known event, carry the
/// socket's own session id, and be a payload clients may originate.
/// Anything else is dropped, not an error.
fn parse_client_event(session_id: &SessionId, raw: &str) -> Option<RoomEvent> {
    let event: RoomEvent = match serde_json::from_str(raw) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(session_id = %session_id, error = %e, "malformed client event dropped");
            return None;
        }
    };

    if event.session_id != *session_id {
        tracing::warn!(
            session_id = %session_id,
            claimed = %event.session_id,
            "client event for foreign session dropped"
        );
        return None;
    }
    if !event.payload.client_publishable() {
        tracing::warn!(
            session_id = %session_id,
            event_type = event.payload.event_type(),
            "client may not publish this event type"
        );
        return None;
    }
    Some(event)
}
