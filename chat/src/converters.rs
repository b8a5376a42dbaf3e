use messages_response::{MessagesResponse, ResponseContentBlock, Usage};
use response::ChatCompletionsResponse;
use tracing::warn;
use uuid::Uuid;

pub fn generate_message_id() -> String {
    format!("msg_{}", Uuid::new_v4().simple())
}

/// Shared finish-reason table: anything unrecognized (or absent) reads as a
/// natural end of turn.
pub fn map_finish_reason(finish_reason: Option<&str>) -> &'static str {
    match finish_reason {
        Some("stop") => "end_turn",
        Some("length") => "max_tokens",
        Some("tool_calls") => "tool_use",
        _ => "end_turn",
    }
}

/// Complete-response translation. Output tokens are computed locally from
/// the concatenated output text and tool-argument strings, the same buffer
/// rule the streaming path uses; upstream usage figures are not consulted.
pub fn convert_response(
    response: &ChatCompletionsResponse,
    model: &str,
    input_tokens: i32,
) -> MessagesResponse {
    let choice = response.choices.first();
    let mut content = Vec::new();
    let mut output_buffer = String::new();

    if let Some(message) = choice.and_then(|choice| choice.message.as_ref()) {
        if let Some(text) = message.content.as_ref().filter(|text| !text.is_empty()) {
            output_buffer.push_str(text);
            content.push(ResponseContentBlock::Text { text: text.clone() });
        }

        for call in message.tool_calls.iter().flatten() {
            // Unparseable arguments degrade to an empty input object rather
            // than failing the whole response.
            let input = serde_json::from_str(&call.function.arguments).unwrap_or_else(|e| {
                warn!(
                    "Tool call {} carried unparseable arguments, substituting empty object: {e}",
                    call.id
                );
                serde_json::json!({})
            });

            output_buffer.push_str(&call.function.arguments);
            content.push(ResponseContentBlock::ToolUse {
                id: call.id.clone(),
                name: call.function.name.clone(),
                input,
            });
        }
    }

    MessagesResponse {
        id: generate_message_id(),
        response_type: "message".to_string(),
        role: "assistant".to_string(),
        content,
        model: model.to_string(),
        stop_reason: Some(
            map_finish_reason(choice.and_then(|choice| choice.finish_reason.as_deref()))
                .to_string(),
        ),
        stop_sequence: None,
        usage: Usage {
            input_tokens,
            output_tokens: tokens::count_tokens(&output_buffer),
        },
    }
}
