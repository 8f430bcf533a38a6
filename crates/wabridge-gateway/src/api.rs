use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::Json;
use serde::Deserialize;
use tracing::{info, warn};
use wabridge_common::InboundEvent;
use wabridge_config::ChatwootConfig;

use crate::events;
use crate::state::SharedState;

/// Agent-reply webhook body, as Chatwoot posts it.
#[derive(Debug, Deserialize)]
pub struct AgentReply {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub conversation: Option<ReplyConversation>,
}

#[derive(Debug, Deserialize)]
pub struct ReplyConversation {
    #[serde(default)]
    pub meta: Option<ReplyMeta>,
    #[serde(default)]
    pub messages: Vec<ReplyMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ReplyMeta {
    #[serde(default)]
    pub sender: Option<ReplySender>,
}

#[derive(Debug, Deserialize)]
pub struct ReplySender {
    #[serde(default)]
    pub phone_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReplyMessage {
    #[serde(default)]
    pub attachments: Vec<ReplyAttachment>,
}

#[derive(Debug, Deserialize)]
pub struct ReplyAttachment {
    #[serde(default)]
    pub data_url: Option<String>,
}

/// POST /v1/events — inbound chat-network webhook. Each event is handled in
/// its own task; the webhook caller gets an immediate 200 either way.
pub async fn inbound_event(
    State(state): State<SharedState>,
    Json(event): Json<InboundEvent>,
) -> StatusCode {
    tokio::spawn(async move {
        events::dispatch(&state, event).await;
    });
    StatusCode::OK
}

/// POST /v1/messages — relay an agent reply back to the chat network.
///
/// Always answers 200 with a body token: a 5xx here would put Chatwoot into a
/// webhook retry loop over what is usually a permanent validation problem.
pub async fn outbound_relay(
    State(state): State<SharedState>,
    Json(reply): Json<AgentReply>,
) -> &'static str {
    if reply.private {
        return "ignored: private message";
    }

    let media_url = reply
        .conversation
        .as_ref()
        .and_then(|c| c.messages.first())
        .and_then(|m| m.attachments.first())
        .and_then(|a| a.data_url.clone());

    let phone = reply
        .conversation
        .as_ref()
        .and_then(|c| c.meta.as_ref())
        .and_then(|m| m.sender.as_ref())
        .and_then(|s| s.phone_number.as_deref())
        .map(|p| p.strip_prefix('+').unwrap_or(p).to_string());

    let Some(phone) = phone else {
        warn!("agent reply without a sender phone number, not relayed");
        return "error sending message";
    };

    match state
        .sender
        .send_message(&phone, &reply.content, media_url.as_deref())
        .await
    {
        Ok(()) => {
            info!("agent reply relayed to {phone}");
            "sent"
        }
        Err(e) => {
            warn!("failed to relay agent reply to {phone}: {e}");
            "error sending message"
        }
    }
}

/// GET /v1/chatwoot — the configuration UI page.
pub async fn config_page(State(state): State<SharedState>) -> impl IntoResponse {
    let html_path = state.config_dir.join("front").join("chatwoot.html");
    match tokio::fs::read_to_string(&html_path).await {
        Ok(html) => Html(html).into_response(),
        Err(_) => (
            StatusCode::OK,
            format!("Error: config page not found at {}", html_path.display()),
        )
            .into_response(),
    }
}

/// POST /v1/save-chatwoot-config — replace the stored credential record.
pub async fn save_config(
    State(state): State<SharedState>,
    Json(config): Json<ChatwootConfig>,
) -> impl IntoResponse {
    match state.store.write(&config) {
        Ok(()) => {
            info!("chatwoot config saved to {}", state.store.path().display());
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "status": "success",
                    "message": "configuration saved",
                })),
            )
        }
        Err(e) => {
            warn!("failed to save chatwoot config: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "status": "error",
                    "message": "failed to write configuration",
                })),
            )
        }
    }
}

/// GET /v1/get-chatwoot-config — current credential record, if any.
pub async fn get_config(State(state): State<SharedState>) -> impl IntoResponse {
    match state.store.try_read() {
        Ok(Some(config)) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "success", "data": config })),
        ),
        Ok(None) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "empty", "data": {} })),
        ),
        Err(e) => {
            warn!("failed to read chatwoot config: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "status": "error",
                    "message": "failed to read configuration",
                })),
            )
        }
    }
}
