use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response, sse::Sse},
};
use chat::providers::{OpenAIV1MessagesProvider, V1MessagesProvider};
use messages_request::{V1MessagesCountTokensRequest, V1MessagesRequest};
use messages_response::V1MessagesCountTokensResponse;
use request::ChatCompletionsRequest;
use std::sync::Arc;
use tracing::info;

use crate::{
    AppState,
    error::AppError,
    utils::{extract_api_key, usage_callback},
};

pub async fn v1_messages(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<V1MessagesRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) =
        payload.map_err(|rejection| AppError::invalid_request(rejection.body_text()))?;

    info!("Received v1/messages request for model: {}", payload.model);

    let api_key =
        extract_api_key(&headers).ok_or_else(|| AppError::authentication("Missing API key"))?;
    validate_model(&payload.model)?;

    let provider = OpenAIV1MessagesProvider::new(
        &api_key,
        &state.upstream_base_url,
        state.provider_prefix.as_deref(),
    );

    if payload.stream.unwrap_or(false) {
        let stream = provider.v1_messages_stream(payload, usage_callback).await?;
        Ok((StatusCode::OK, Sse::new(stream)).into_response())
    } else {
        let response = provider.v1_messages(payload).await?;
        Ok(Json(response).into_response())
    }
}

/// Runs the request through the same translation and summation as a real
/// call, so a prior count and the `message_start` estimate of a
/// subsequent identical request always agree.
pub async fn v1_messages_count_tokens(
    payload: Result<Json<V1MessagesCountTokensRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) =
        payload.map_err(|rejection| AppError::invalid_request(rejection.body_text()))?;

    info!(
        "Received v1/messages/count_tokens request for model: {}",
        payload.model
    );

    let converted = ChatCompletionsRequest::from(&payload);
    Ok(Json(V1MessagesCountTokensResponse {
        input_tokens: tokens::estimate_input_tokens(&converted),
    }))
}

fn validate_model(model: &str) -> Result<(), AppError> {
    if model.contains("claude") {
        Ok(())
    } else {
        Err(AppError::invalid_request(format!(
            "Model \"{model}\" is not a Claude model. Only Claude models are supported."
        )))
    }
}
