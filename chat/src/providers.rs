use async_trait::async_trait;
use axum::response::sse::Event;
use futures::stream::BoxStream;
use messages_request::V1MessagesRequest;
use messages_response::MessagesResponse;
use response::Usage;

use crate::error::ProviderError;

pub mod openai;

pub use openai::OpenAIV1MessagesProvider;

/// A backend able to serve block-structured message requests. Providers
/// are constructed per request; both entry points consume the provider.
#[async_trait]
pub trait V1MessagesProvider {
    /// Non-streaming request/response round trip.
    async fn v1_messages(
        self,
        request: V1MessagesRequest,
    ) -> Result<MessagesResponse, ProviderError>;

    /// Streaming round trip. The returned stream always runs to a
    /// terminal event: `message_stop` on success, a single `error` event
    /// on any upstream failure. `usage_callback` observes every usage
    /// frame the upstream reports; those figures are logged only and
    /// never folded into the translated events.
    async fn v1_messages_stream<F>(
        self,
        request: V1MessagesRequest,
        usage_callback: F,
    ) -> anyhow::Result<BoxStream<'async_trait, anyhow::Result<Event>>>
    where
        F: Fn(&Usage) + Send + Sync + 'static;
}
