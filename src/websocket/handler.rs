use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{
        rejection::QueryRejection,
        ws::{CloseFrame, Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::server::AppState;

use super::hub::CloseReason;
use super::message::{ClientMessage, OutboundMessage, ServerMessage};

const CHANNEL_BUFFER_SIZE: usize = 32;

/// How long a forced close waits for the queued close frame to be written
const CLOSE_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

impl WsQuery {
    /// The user identifier, if present and not blank. Kept verbatim otherwise.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
    }
}

/// WebSocket upgrade handler
#[tracing::instrument(name = "ws.upgrade", skip_all)]
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    query: Result<Query<WsQuery>, QueryRejection>,
) -> Response {
    let user_id = match &query {
        Ok(Query(query)) => query.user_id().map(str::to_string),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Unreadable WebSocket query string");
            None
        }
    };
    let Some(user_id) = user_id else {
        tracing::warn!("WebSocket connection without userId, closing");
        return ws.on_upgrade(|socket| reject_socket(socket, CloseReason::MissingUserId));
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id))
}

/// Close a freshly upgraded socket before it reaches the registry
async fn reject_socket(mut socket: WebSocket, reason: CloseReason) {
    let _ = socket.send(close_message(reason)).await;
}

fn close_message(reason: CloseReason) -> Message {
    Message::Close(Some(CloseFrame {
        code: reason.code(),
        reason: reason.reason().into(),
    }))
}

/// Handle an established WebSocket connection
#[tracing::instrument(name = "ws.connection", skip(socket, state))]
async fn handle_socket(socket: WebSocket, state: AppState, user_id: String) {
    let connection_id = Uuid::new_v4();
    let connection_start = std::time::Instant::now();

    // Control channel used by the heartbeat monitor and the receive loop
    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(CHANNEL_BUFFER_SIZE);
    let mut terminated = state.hub.attach(connection_id, tx.clone());

    if let Err(e) = state.tracker.connect(connection_id, &user_id).await {
        tracing::error!(connection_id = %connection_id, error = %e, "Connection rejected");
        state.hub.detach(connection_id);
        return;
    }

    tracing::info!(
        connection_id = %connection_id,
        user_id = %user_id,
        "WebSocket connection established"
    );

    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Task for writing queued frames to the WebSocket
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let frame = match msg {
                OutboundMessage::Probe => Message::Ping(Bytes::new()),
                OutboundMessage::Close(reason) => {
                    let _ = ws_sender.send(close_message(reason)).await;
                    break;
                }
                OutboundMessage::Server(message) => match serde_json::to_string(&message) {
                    Ok(text) => Message::Text(text.into()),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to serialize message");
                        continue;
                    }
                },
            };

            if ws_sender.send(frame).await.is_err() {
                break;
            }
        }
    });

    // Task for reading frames from the WebSocket
    let recv_state = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = ws_receiver.next().await {
            match result {
                Ok(msg) => {
                    if !process_message(msg, &recv_state, connection_id, &tx).await {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(connection_id = %connection_id, error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    // Wait for either task to complete, then stop the other one
    tokio::select! {
        _ = &mut send_task => {
            tracing::debug!(connection_id = %connection_id, "Send task completed");
            recv_task.abort();
        }
        _ = &mut recv_task => {
            tracing::debug!(connection_id = %connection_id, "Receive task completed");
            send_task.abort();
        }
        Ok(reason) = &mut terminated => {
            tracing::debug!(
                connection_id = %connection_id,
                code = reason.code(),
                "Session terminated by server"
            );
            recv_task.abort();
            // Let the close frame out if the socket is writable, then drop it
            if tokio::time::timeout(CLOSE_GRACE, &mut send_task).await.is_err() {
                send_task.abort();
            }
        }
    }

    // A heartbeat eviction may already have removed it; both calls are idempotent
    state.hub.detach(connection_id);
    state.tracker.disconnect(connection_id).await;

    tracing::info!(
        connection_id = %connection_id,
        user_id = %user_id,
        duration_secs = connection_start.elapsed().as_secs_f64(),
        "WebSocket connection closed"
    );
}

/// Process a received WebSocket message
/// Returns false if the connection should be closed
async fn process_message(
    msg: Message,
    state: &AppState,
    connection_id: Uuid,
    tx: &mpsc::Sender<OutboundMessage>,
) -> bool {
    match msg {
        Message::Pong(_) => {
            state.tracker.record_liveness(connection_id).await;
            true
        }
        Message::Ping(_) => {
            // Axum answers pings itself
            true
        }
        Message::Text(text) => {
            match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Ping) => {
                    state.tracker.record_liveness(connection_id).await;
                    let _ = tx.send(OutboundMessage::Server(ServerMessage::Pong)).await;
                }
                Err(e) => {
                    tracing::debug!(connection_id = %connection_id, error = %e, "Failed to parse client message");
                    let _ = tx
                        .send(OutboundMessage::Server(ServerMessage::error(
                            "INVALID_MESSAGE",
                            e.to_string(),
                        )))
                        .await;
                }
            }
            true
        }
        Message::Binary(_) => {
            let _ = tx
                .send(OutboundMessage::Server(ServerMessage::error(
                    "UNSUPPORTED_FORMAT",
                    "Binary messages are not supported",
                )))
                .await;
            true
        }
        Message::Close(_) => {
            tracing::debug!(connection_id = %connection_id, "Received close frame");
            false
        }
    }
}
