use serde::{Deserialize, Serialize};

use crate::Usage;

/// One streamed delta-protocol frame, parsed from a `data:` line.
#[derive(Debug, Deserialize, Serialize)]
pub struct ChatCompletionsChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ChunkDelta {
    pub role: Option<String>,
    pub content: Option<String>,
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

/// Tool-call fragment keyed by a flat index. A fragment carrying `id`
/// opens a new call; id-less fragments continue the current one.
#[derive(Debug, Deserialize, Serialize)]
pub struct ToolCallDelta {
    pub index: Option<i32>,
    pub id: Option<String>,
    pub function: Option<FunctionCallDelta>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct FunctionCallDelta {
    pub name: Option<String>,
    pub arguments: Option<String>,
}
