use serde::{Deserialize, Serialize};

use crate::content::Contents;
use crate::tool::ToolCall;

/// One flat message. `content` is always serialized, as `null` when the
/// message carries only tool calls.
#[derive(Debug, Deserialize, Serialize)]
pub struct Message {
    #[serde(rename = "content")]
    pub contents: Option<Contents>,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            contents: Some(Contents::String(text.into())),
            role,
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Assistant,
    System,
    User,
    Tool,
}
