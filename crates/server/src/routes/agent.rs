// crates/server/src/routes/agent.rs
//! Operator chat and training summary.
//!
//! - POST /agent-chat   - one-shot question, JSON in and out
//! - GET  /agent/summary - watcher summary of the current generation
//! - WS   /ws/agent     - chat with structured replies
//! - WS   /ws/chat      - plain-text chat

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use trainview_core::{ChatReply, TrainingSummary};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AgentChatRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub struct AgentChatResponse {
    pub response: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSummaryResponse {
    #[serde(flatten)]
    pub summary: TrainingSummary,
    pub restart_requested: bool,
}

/// Frame accepted on /ws/agent. Anything that does not parse is taken as
/// the question itself.
#[derive(Debug, Deserialize)]
struct AgentFrame {
    #[serde(default)]
    content: String,
}

/// POST /agent-chat - Answer a single operator question.
pub async fn agent_chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AgentChatRequest>,
) -> Json<AgentChatResponse> {
    let question = req.message.trim();
    if question.is_empty() {
        return Json(AgentChatResponse {
            response: "No message received.".to_string(),
        });
    }
    tracing::debug!(question, "Agent chat request");
    Json(AgentChatResponse {
        response: state.agent.handle_query(question),
    })
}

/// GET /agent/summary - How the current generation is going.
pub async fn agent_summary(State(state): State<Arc<AppState>>) -> Json<AgentSummaryResponse> {
    Json(AgentSummaryResponse {
        summary: state.controller.summary(),
        restart_requested: state.agent.restart_requested(),
    })
}

pub async fn agent_ws(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_agent_socket(socket, state))
}

pub async fn chat_ws(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_chat_socket(socket, state))
}

async fn handle_agent_socket(mut socket: WebSocket, state: Arc<AppState>) {
    tracing::debug!("Agent chat connected");
    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => {
                let question = match serde_json::from_str::<AgentFrame>(text.as_str()) {
                    Ok(frame) => frame.content,
                    Err(_) => text.to_string(),
                };
                let reply = ChatReply::from_agent(state.agent.handle_query(&question));
                let frame = match serde_json::to_string(&reply) {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to encode chat reply");
                        continue;
                    }
                };
                if socket.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    tracing::debug!("Agent chat disconnected");
}

async fn handle_chat_socket(mut socket: WebSocket, state: Arc<AppState>) {
    tracing::debug!("Plain chat connected");
    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => {
                let reply = if text.trim().is_empty() {
                    "Empty message received.".to_string()
                } else {
                    state.agent.handle_query(text.as_str())
                };
                if socket.send(Message::Text(reply.into())).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    tracing::debug!("Plain chat disconnected");
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/agent-chat", post(agent_chat))
        .route("/agent/summary", get(agent_summary))
        .route("/ws/agent", get(agent_ws))
        .route("/ws/chat", get(chat_ws))
}
