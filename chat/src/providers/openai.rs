use async_trait::async_trait;
use axum::response::sse::Event;
use futures::StreamExt;
use futures::stream::BoxStream;
use messages_request::V1MessagesRequest;
use messages_response::{ErrorDetail, MessagesResponse, StreamEvent};
use request::ChatCompletionsRequest;
use response::{ChatCompletionsChunk, ChatCompletionsResponse, Usage};
use tracing::{debug, error, info};

use crate::converters::{convert_response, generate_message_id};
use crate::error::ProviderError;
use crate::providers::V1MessagesProvider;
use crate::stream::EventConverter;

/// Delta-protocol backend reached over HTTP. The caller's API key is
/// forwarded as a bearer token; an optional prefix is prepended to the
/// model id on the wire (the translated response keeps the caller's id).
pub struct OpenAIV1MessagesProvider {
    api_key: String,
    base_url: String,
    provider_prefix: Option<String>,
}

impl OpenAIV1MessagesProvider {
    pub fn new(api_key: &str, base_url: &str, provider_prefix: Option<&str>) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: base_url.to_string(),
            provider_prefix: provider_prefix.map(str::to_string),
        }
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn convert(&self, request: &V1MessagesRequest) -> ChatCompletionsRequest {
        let mut converted = ChatCompletionsRequest::from(request);
        if let Some(prefix) = &self.provider_prefix {
            converted.model = format!("{prefix}/{}", converted.model);
        }
        converted
    }
}

#[async_trait]
impl V1MessagesProvider for OpenAIV1MessagesProvider {
    async fn v1_messages(
        self,
        request: V1MessagesRequest,
    ) -> Result<MessagesResponse, ProviderError> {
        let converted = self.convert(&request);
        let input_tokens = tokens::estimate_input_tokens(&converted);
        debug!(
            "Forwarding request for model {} ({} messages, {input_tokens} estimated input tokens)",
            converted.model,
            converted.messages.len()
        );

        let client = reqwest::Client::new();
        let response = client
            .post(self.chat_completions_url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&converted)
            .send()
            .await
            .map_err(ProviderError::transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Upstream error: {status} - {body}");
            return Err(ProviderError::upstream(status.as_u16(), body));
        }

        let completion: ChatCompletionsResponse =
            response.json().await.map_err(ProviderError::transport)?;

        Ok(convert_response(&completion, &request.model, input_tokens))
    }

    async fn v1_messages_stream<F>(
        self,
        request: V1MessagesRequest,
        usage_callback: F,
    ) -> anyhow::Result<BoxStream<'async_trait, anyhow::Result<Event>>>
    where
        F: Fn(&Usage) + Send + Sync + 'static,
    {
        let converted = self.convert(&request);
        let input_tokens = tokens::estimate_input_tokens(&converted);
        debug!(
            "Starting stream for model {} ({input_tokens} estimated input tokens)",
            converted.model
        );

        let url = self.chat_completions_url();
        let api_key = self.api_key.clone();
        let model = request.model.clone();

        let stream = async_stream::stream! {
            let mut converter =
                EventConverter::new(generate_message_id(), model, input_tokens);
            yield create_sse_event(&converter.message_start());

            let client = reqwest::Client::new();
            let result = client
                .post(&url)
                .header("Authorization", format!("Bearer {api_key}"))
                .header("Content-Type", "application/json")
                .json(&converted)
                .send()
                .await;

            let response = match result {
                Ok(response) => response,
                Err(e) => {
                    error!("Upstream request failed: {e}");
                    yield create_sse_event(&error_event(e.to_string()));
                    return;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                error!("Upstream error: {status} - {body}");
                yield create_sse_event(&error_event(body));
                return;
            }

            info!("Connected to upstream, relaying stream");

            let mut upstream = response.bytes_stream();
            let mut buffer: Vec<u8> = Vec::new();

            while let Some(bytes) = upstream.next().await {
                let bytes = match bytes {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        error!("Upstream stream failed mid-read: {e}");
                        yield create_sse_event(&error_event(e.to_string()));
                        return;
                    }
                };

                buffer.extend_from_slice(&bytes);
                while let Some(newline) = buffer.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=newline).collect();
                    let line = String::from_utf8_lossy(&line);
                    let Some(frame) = decode_data_line(line.trim_end_matches(['\n', '\r'])) else {
                        continue;
                    };

                    if let Some(usage) = &frame.usage {
                        usage_callback(usage);
                    }

                    for event in converter.convert(&frame) {
                        yield create_sse_event(&event);
                    }
                }
            }

            for event in converter.finish() {
                yield create_sse_event(&event);
            }
        };

        Ok(stream.boxed())
    }
}

fn error_event(message: String) -> StreamEvent {
    StreamEvent::Error {
        error: ErrorDetail::api_error(message),
    }
}

fn create_sse_event(event: &StreamEvent) -> anyhow::Result<Event> {
    let json = serde_json::to_string(event)?;
    Ok(Event::default().event(event.name()).data(json))
}

/// One complete SSE line. Non-`data:` lines, the `[DONE]` sentinel, and
/// undecodable frames all yield nothing; a bad frame is skipped rather
/// than aborting the stream.
fn decode_data_line(line: &str) -> Option<ChatCompletionsChunk> {
    let payload = line.strip_prefix("data: ")?;
    if payload == "[DONE]" {
        return None;
    }

    match serde_json::from_str(payload) {
        Ok(chunk) => Some(chunk),
        Err(e) => {
            debug!("Skipping undecodable stream frame: {e}");
            None
        }
    }
}
