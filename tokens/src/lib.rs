use std::sync::LazyLock;

use request::ChatCompletionsRequest;
use tiktoken_rs::CoreBPE;
use tracing::warn;

/// Process-wide encoder, built on first use and shared by every request.
/// `cl100k_base` is a close approximation for the models served here.
static ENCODER: LazyLock<Option<CoreBPE>> = LazyLock::new(|| match tiktoken_rs::cl100k_base() {
    Ok(bpe) => Some(bpe),
    Err(e) => {
        warn!("Failed to build cl100k_base encoder, falling back to byte estimate: {e}");
        None
    }
});

/// Fixed overhead per flat message for role tags and framing.
const MESSAGE_OVERHEAD_TOKENS: i32 = 4;

pub fn count_tokens(text: &str) -> i32 {
    ENCODER.as_ref().map_or_else(
        || (text.len() / 4) as i32,
        |bpe| bpe.encode_with_special_tokens(text).len() as i32,
    )
}

/// Input-token estimate over a translated request: every text segment of
/// every message, a fixed per-message overhead, and the serialized tool
/// definitions. The count-tokens endpoint and the streaming
/// `message_start` usage both go through this one summation.
pub fn estimate_input_tokens(request: &ChatCompletionsRequest) -> i32 {
    let mut total = 0;

    for message in &request.messages {
        if let Some(contents) = &message.contents {
            total += count_tokens(&contents.text_parts());
        }
        total += MESSAGE_OVERHEAD_TOKENS;
    }

    if let Some(tools) = &request.tools {
        total += serde_json::to_string(tools)
            .map(|serialized| count_tokens(&serialized))
            .unwrap_or(0);
    }

    total
}
