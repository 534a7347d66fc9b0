// crates/server/src/routes/stream.rs
//! WS /ws/train - live training stream.
//!
//! Each socket becomes a [`Session`] in the registry. A writer task drains
//! the session's outbox into the socket; the read half is only watched for
//! close so the session can be detached.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};

use crate::hub::Session;
use crate::state::AppState;

pub async fn train_ws(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sink, mut stream) = socket.split();
    let (session, mut outbox) = Session::open("train");
    let session_id = session.id();
    state.registry.attach(session);

    let mut forward_task = tokio::spawn(async move {
        while let Some(frame) = outbox.recv().await {
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            _ = &mut forward_task => {
                tracing::debug!(session_id = %session_id, "Stream writer ended");
                break;
            }
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    tracing::debug!(session_id = %session_id, error = %e, "Stream read failed");
                    break;
                }
                // Observers have nothing to say; inbound frames only keep the socket alive.
                Some(Ok(_)) => {}
            }
        }
    }

    state.registry.detach(session_id);
    forward_task.abort();
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/ws/train", get(train_ws))
}
