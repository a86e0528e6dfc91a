use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::realtime::broadcaster::TRIP_CREATED;
use crate::realtime::ConnectionId;
use crate::state::AppState;

/// Frames a client may send. Anything else is ignored.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data")]
enum ClientEvent {
    /// Subscribe to one trip's room.
    #[serde(rename = "joinTrip")]
    JoinTrip(String),
    /// Client-originated trip announcement, re-broadcast verbatim.
    #[serde(rename = "newTrip")]
    NewTrip(Value),
}

pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let conn_id = state.broadcaster.connect(tx).await;
    info!(conn_id, "websocket client connected");

    loop {
        tokio::select! {
            outbound = rx.recv() => {
                let Some(message) = outbound else { break };
                if socket.send(message).await.is_err() {
                    break;
                }
            }
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_event(&state, conn_id, &text).await;
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    state.broadcaster.disconnect(conn_id).await;
    info!(conn_id, "websocket client disconnected");
}

async fn handle_client_event(state: &AppState, conn_id: ConnectionId, raw: &str) {
    match serde_json::from_str::<ClientEvent>(raw) {
        Ok(ClientEvent::JoinTrip(trip_id)) => {
            state.broadcaster.join_room(conn_id, &trip_id).await;
        }
        Ok(ClientEvent::NewTrip(payload)) => {
            state.broadcaster.broadcast(TRIP_CREATED, &payload).await;
        }
        Err(err) => {
            debug!(conn_id, %err, "ignoring malformed client frame");
        }
    }
}
