// libs/realtime-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_state::AppState;

/// Upgrade to a WebSocket that mirrors every calendar change to the client.
#[axum::debug_handler]
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let connection_id = Uuid::new_v4();
    info!("Client connected: {}", connection_id);

    let mut events = state.events.subscribe();
    let (mut sink, mut stream) = socket.split();

    let mut push_task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(message) => {
                    if sink.send(Message::Text(message.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    // The client keeps its view as a cache and refetches,
                    // so dropped events are survivable
                    warn!("Dropped {} events for a slow client", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut drain_task = tokio::spawn(async move {
        // Viewers only listen; drain frames until the client goes away
        while let Some(Ok(frame)) = stream.next().await {
            match frame {
                Message::Close(_) => break,
                other => debug!("Ignoring client frame: {:?}", other),
            }
        }
    });

    tokio::select! {
        _ = &mut push_task => drain_task.abort(),
        _ = &mut drain_task => push_task.abort(),
    }

    info!("Client disconnected: {}", connection_id);
}
