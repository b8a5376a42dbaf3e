//! Request-side translation from the block-structured messages protocol to
//! the flat delta-protocol `ChatCompletionsRequest`.
//!
//! These `From` impls live here rather than in the `chat` engine because the
//! orphan rule requires the impl to sit in the crate that owns the `Self`
//! type (`ChatCompletionsRequest`). The logic is unchanged.

use messages_request::{
    ContentBlock, Contents, Message, Systems, Tool, ToolChoice, V1MessagesCountTokensRequest,
    V1MessagesRequest, collect_text,
};
use uuid::Uuid;

use crate::{
    ChatCompletionsRequest, Content, Contents as FlatContents, ImageUrl, Message as FlatMessage,
    Role, StreamOptions, Tool as FlatTool, ToolCall, ToolChoice as FlatToolChoice,
    ToolChoiceFunction,
};

fn generate_call_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(12);
    format!("call_{id}")
}

impl From<&V1MessagesRequest> for ChatCompletionsRequest {
    fn from(request: &V1MessagesRequest) -> Self {
        let stream = request.stream.unwrap_or(false);

        ChatCompletionsRequest {
            messages: convert_messages(&request.messages, request.system.as_ref()),
            max_tokens: Some(request.max_tokens),
            model: request.model.clone(),
            stop: request.stop_sequences.clone(),
            stream,
            stream_options: stream.then(|| StreamOptions {
                include_usage: true,
            }),
            temperature: request.temperature,
            top_p: request.top_p,
            user: request
                .metadata
                .as_ref()
                .and_then(|metadata| metadata.user_id.clone()),
            tools: convert_tools(request.tools.as_deref()),
            tool_choice: request.tool_choice.as_ref().map(convert_tool_choice),
        }
    }
}

impl From<&V1MessagesCountTokensRequest> for ChatCompletionsRequest {
    fn from(request: &V1MessagesCountTokensRequest) -> Self {
        ChatCompletionsRequest {
            messages: convert_messages(&request.messages, request.system.as_ref()),
            max_tokens: None,
            model: request.model.clone(),
            stop: None,
            stream: false,
            stream_options: None,
            temperature: None,
            top_p: None,
            user: None,
            tools: convert_tools(request.tools.as_deref()),
            tool_choice: request.tool_choice.as_ref().map(convert_tool_choice),
        }
    }
}

pub fn convert_messages(messages: &[Message], system: Option<&Systems>) -> Vec<FlatMessage> {
    let mut flat = Vec::new();

    if let Some(system) = system {
        flat.push(FlatMessage::text(Role::System, system.joined_text()));
    }

    for message in messages {
        let role = if message.is_assistant() {
            Role::Assistant
        } else {
            Role::User
        };

        match message.content() {
            Contents::String(text) => flat.push(FlatMessage::text(role, text.clone())),
            Contents::Array(blocks) => {
                let tool_uses: Vec<_> = blocks
                    .iter()
                    .filter(|block| matches!(block, ContentBlock::ToolUse { .. }))
                    .collect();
                let tool_results: Vec<_> = blocks
                    .iter()
                    .filter(|block| matches!(block, ContentBlock::ToolResult { .. }))
                    .collect();

                if message.is_assistant() && !tool_uses.is_empty() {
                    flat.push(convert_tool_use_message(blocks, &tool_uses));
                } else if !tool_results.is_empty() {
                    for block in tool_results {
                        if let ContentBlock::ToolResult {
                            tool_use_id,
                            content,
                        } = block
                        {
                            flat.push(FlatMessage {
                                contents: Some(FlatContents::String(content.flattened_text())),
                                role: Role::Tool,
                                tool_calls: None,
                                tool_call_id: Some(tool_use_id.clone()),
                            });
                        }
                    }
                } else {
                    let has_parts = blocks.iter().any(|block| {
                        matches!(
                            block,
                            ContentBlock::Text { .. } | ContentBlock::Image { .. }
                        )
                    });
                    // Nothing representable on the flat side: drop the entry.
                    if has_parts {
                        flat.push(convert_parts_message(blocks, role));
                    }
                }
            }
        }
    }

    flat
}

/// One flat assistant message per block-structured tool-use turn: text
/// blocks concatenated (null when there are none), one call per
/// `tool_use` block with its input serialized to a JSON string.
fn convert_tool_use_message(blocks: &[ContentBlock], tool_uses: &[&ContentBlock]) -> FlatMessage {
    let has_text = blocks
        .iter()
        .any(|block| matches!(block, ContentBlock::Text { .. }));

    let tool_calls = tool_uses
        .iter()
        .filter_map(|block| match block {
            ContentBlock::ToolUse { id, name, input } => Some(ToolCall::function(
                id.clone().unwrap_or_else(generate_call_id),
                name.clone(),
                input.to_string(),
            )),
            _ => None,
        })
        .collect();

    FlatMessage {
        contents: has_text.then(|| FlatContents::String(collect_text(blocks))),
        role: Role::Assistant,
        tool_calls: Some(tool_calls),
        tool_call_id: None,
    }
}

/// Text/image blocks become a parts list, collapsed to a bare string when
/// exactly one text part remains.
fn convert_parts_message(blocks: &[ContentBlock], role: Role) -> FlatMessage {
    let parts: Vec<Content> = blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } if !text.is_empty() => Some(Content::Text {
                text: text.clone(),
            }),
            ContentBlock::Image { source } => Some(Content::ImageUrl {
                image_url: ImageUrl::from_base64(&source.media_type, &source.data),
            }),
            _ => None,
        })
        .collect();

    let contents = match parts.as_slice() {
        [Content::Text { text }] => FlatContents::String(text.clone()),
        _ => FlatContents::Array(parts),
    };

    FlatMessage {
        contents: Some(contents),
        role,
        tool_calls: None,
        tool_call_id: None,
    }
}

pub fn convert_tools(tools: Option<&[Tool]>) -> Option<Vec<FlatTool>> {
    let tools = tools?;
    Some(
        tools
            .iter()
            .map(|tool| {
                FlatTool::function(
                    tool.name.clone(),
                    tool.description.clone(),
                    tool.input_schema.clone(),
                )
            })
            .collect(),
    )
}

/// Exact mapping table; `any` maps to `"required"` on the
/// chat-completions side, not to a literal `"any"`.
pub fn convert_tool_choice(tool_choice: &ToolChoice) -> FlatToolChoice {
    match tool_choice.kind() {
        "auto" => FlatToolChoice::String("auto".to_string()),
        "any" => FlatToolChoice::String("required".to_string()),
        "none" => FlatToolChoice::String("none".to_string()),
        "tool" => FlatToolChoice::Object {
            tool_type: "function".to_string(),
            function: ToolChoiceFunction {
                name: tool_choice.tool_name().unwrap_or_default().to_string(),
            },
        },
        _ => FlatToolChoice::String("auto".to_string()),
    }
}
