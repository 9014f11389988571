//! `WebSocket` handler for the real-time event mirror.
//!
//! Clients connect to `GET /ws/events` and receive every
//! [`EventEnvelope`](frontline_types::EventEnvelope) the core publishes,
//! JSON-encoded, one per text frame. Envelopes carry their global sequence
//! number, so a client that lags and skips ahead can see the gap.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming events.
///
/// # Route
///
/// `GET /ws/events`
pub async fn ws_events(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Forward each envelope as a text frame until either side goes away.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let mut rx = state.subscribe();
    debug!(
        from_sequence = state.frontline.bus().last_sequence(),
        "event stream client connected"
    );

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(envelope) => {
                        let json = match serde_json::to_string(&envelope) {
                            Ok(j) => j,
                            Err(e) => {
                                warn!(sequence = envelope.sequence, "failed to serialize event: {e}");
                                continue;
                            }
                        };
                        if socket.send(Message::Text(json.into())).await.is_err() {
                            debug!("event stream client disconnected (send failed)");
                            return;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "event stream client lagged, skipping ahead");
                    }
                    Err(RecvError::Closed) => {
                        debug!("event bus closed, shutting down stream");
                        return;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("event stream client disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            return;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!("event stream receive error: {e}");
                        return;
                    }
                }
            }
        }
    }
}
