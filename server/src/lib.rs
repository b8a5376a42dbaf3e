use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

pub mod error;
pub mod handlers;
pub mod utils;

use handlers::messages::{v1_messages, v1_messages_count_tokens};
use handlers::misc::{health, not_found};

pub struct AppState {
    pub upstream_base_url: String,
    pub provider_prefix: Option<String>,
}

pub fn get_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/messages", post(v1_messages))
        .route("/v1/messages/count_tokens", post(v1_messages_count_tokens))
        .route("/health", get(health))
        .fallback(not_found)
        .with_state(state)
}
