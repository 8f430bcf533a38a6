use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::api;
use crate::state::SharedState;

/// Inbound events carry base64-encoded media inline, so the event route
/// needs far more headroom than axum's default request-body limit.
const MAX_EVENT_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Build the main application router with all routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/v1/events",
            post(api::inbound_event).layer(DefaultBodyLimit::max(MAX_EVENT_BODY_BYTES)),
        )
        .route("/v1/messages", post(api::outbound_relay))
        .route("/v1/chatwoot", get(api::config_page))
        .route("/v1/save-chatwoot-config", post(api::save_config))
        .route("/v1/get-chatwoot-config", get(api::get_config))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
