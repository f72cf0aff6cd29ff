//! WebSocket subscribers for live token events.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use ts_scanner::Subscription;

use crate::AppState;

/// GET /ws
pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let Subscription { id, mut receiver } = state.scanner.subscribe(state.subscriber_buffer);
    info!(subscriber_id = id, "websocket connected");

    let (mut sender, mut inbound) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!(subscriber_id = id, error = %e, "event not serializable");
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = inbound.next().await {
            match message {
                Message::Text(text) => match serde_json::from_str::<serde_json::Value>(&text) {
                    Ok(value) => debug!(subscriber_id = id, message = %value, "client message"),
                    Err(e) => warn!(subscriber_id = id, error = %e, "unparseable client message"),
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.scanner.unsubscribe(id);
    info!(subscriber_id = id, "websocket closed");
}
