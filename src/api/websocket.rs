//! WebSocket Support for Real-time Round Events
//!
//! Streams the engine's event bus to connected clients:
//! - Round lifecycle (committed, started, crashed, settled)
//! - Bets and cashouts as they land
//! - Heartbeats to keep connections alive

use super::handlers::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::{sync::Arc, time::Duration};
use tokio::{sync::broadcast::error::RecvError, time::interval};
use tracing::{debug, warn};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Upgrade an HTTP request to a round-event stream.
pub async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = state.game.events().subscribe();
    let mut heartbeat = interval(HEARTBEAT_INTERVAL);

    debug!("websocket client connected");

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        let payload = match serde_json::to_string(&event) {
                            Ok(json) => json,
                            Err(e) => {
                                warn!("failed to serialize event: {}", e);
                                continue;
                            }
                        };
                        if sender.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    // Slow consumer missed events; keep streaming from here.
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("websocket client lagged, skipped {} events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            _ = heartbeat.tick() => {
                let payload = serde_json::json!({
                    "type": "heartbeat",
                    "tick": state.game.now_tick(),
                })
                .to_string();
                if sender.send(Message::Text(payload)).await.is_err() {
                    break;
                }
            }
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {} // inbound text is ignored; this stream is one-way
                    Some(Err(e)) => {
                        debug!("websocket error: {}", e);
                        break;
                    }
                }
            }
        }
    }

    debug!("websocket client disconnected");
}
