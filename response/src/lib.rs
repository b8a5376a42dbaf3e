use serde::{Deserialize, Serialize};

pub mod chunk;

pub use chunk::*;

/// Complete (non-streaming) delta-protocol response.
#[derive(Debug, Deserialize, Serialize)]
pub struct ChatCompletionsResponse {
    pub choices: Vec<Choice>,
    pub created: Option<i64>,
    pub id: Option<String>,
    pub model: Option<String>,
    pub object: Option<String>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Choice {
    #[serde(default)]
    pub index: i32,
    pub message: Option<ChoiceMessage>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ChoiceMessage {
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ChoiceToolCall>>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ChoiceToolCall {
    pub id: String,
    pub function: ChoiceFunctionCall,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ChoiceFunctionCall {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Usage {
    #[serde(default)]
    pub completion_tokens: i32,
    #[serde(default)]
    pub prompt_tokens: i32,
    #[serde(default)]
    pub total_tokens: i32,
}
