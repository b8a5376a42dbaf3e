use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Contents {
    Array(Vec<ContentBlock>),
    String(String),
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image")]
    Image { source: ImageSource },
    #[serde(rename = "tool_use")]
    ToolUse {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        name: String,
        input: serde_json::Value,
    },
    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        content: ToolResultContents,
    },
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ImageSource {
    pub data: String,
    pub media_type: String,
    #[serde(rename = "type")]
    pub source_type: String,
}

/// A tool result carries either a bare string or nested content blocks.
#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ToolResultContents {
    Array(Vec<ContentBlock>),
    String(String),
}

impl Contents {
    /// Concatenated text of all text blocks, empty for non-text content.
    pub fn joined_text(&self) -> String {
        match self {
            Contents::String(s) => s.clone(),
            Contents::Array(blocks) => collect_text(blocks),
        }
    }
}

impl ToolResultContents {
    pub fn flattened_text(&self) -> String {
        match self {
            ToolResultContents::String(s) => s.clone(),
            ToolResultContents::Array(blocks) => collect_text(blocks),
        }
    }
}

pub fn collect_text(blocks: &[ContentBlock]) -> String {
    blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}
