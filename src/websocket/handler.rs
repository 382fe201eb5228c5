use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::connection::ConnectionHandle;
use crate::error::LobbyError;
use crate::server::AppState;

use super::message::{ClientFrame, OutboundFrame, ServerFrame};

const CHANNEL_BUFFER_SIZE: usize = 32;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    // Channel for frames headed to this connection
    let (tx, mut rx) = mpsc::channel::<OutboundFrame>(CHANNEL_BUFFER_SIZE);
    let handle = Arc::new(ConnectionHandle::new(tx));
    let connection_id = handle.id;

    tracing::info!(connection_id = %connection_id, "WebSocket connection established");

    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Task for sending frames from the channel to the WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let text = match frame.to_json() {
                Ok(t) => t,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize frame");
                    continue;
                }
            };

            if ws_sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Task for receiving frames from the WebSocket
    let state_clone = state.clone();
    let handle_clone = handle.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(result) = ws_receiver.next().await {
            match result {
                Ok(msg) => {
                    if !process_message(msg, &state_clone, &handle_clone).await {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = send_task => {
            tracing::debug!(connection_id = %connection_id, "Send task completed");
        }
        _ = recv_task => {
            tracing::debug!(connection_id = %connection_id, "Receive task completed");
        }
    }

    // Implicit leave for whichever member was bound to this connection
    state.router.handle_disconnect(connection_id).await;

    tracing::info!(connection_id = %connection_id, "WebSocket connection closed");
}

/// Process a received WebSocket message.
/// Returns false if the connection should be closed.
async fn process_message(
    msg: Message,
    state: &AppState,
    handle: &Arc<ConnectionHandle>,
) -> bool {
    match msg {
        Message::Text(text) => {
            match serde_json::from_str::<ClientFrame>(&text) {
                Ok(frame) => state.router.dispatch(frame, handle).await,
                Err(e) => {
                    tracing::warn!(
                        connection_id = %handle.id,
                        error = %e,
                        "Failed to parse client frame"
                    );
                    handle.send_event(ServerFrame::error(
                        LobbyError::MalformedRequest.client_message(),
                    ));
                }
            }
            true
        }
        Message::Binary(_) => {
            // Binary frames are not part of the protocol
            handle.send_event(ServerFrame::error(
                LobbyError::MalformedRequest.client_message(),
            ));
            true
        }
        Message::Ping(_) | Message::Pong(_) => true,
        Message::Close(_) => {
            tracing::debug!(connection_id = %handle.id, "Received close frame");
            false
        }
    }
}
