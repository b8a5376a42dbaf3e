use axum::{
    Json,
    http::{Method, Uri},
    response::IntoResponse,
};
use tracing::warn;

use crate::error::AppError;

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok", "service": "messages-proxy"}))
}

pub async fn not_found(method: Method, uri: Uri) -> AppError {
    warn!("Unhandled route: {method} {uri}");
    AppError::not_found(format!("Endpoint {method} {uri} not found"))
}
