use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
pub struct Tool {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input_schema: serde_json::Value,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(untagged)]
pub enum ToolChoice {
    String(String), // "auto", "any", "none"
    Object {
        #[serde(rename = "type")]
        choice_type: String, // "auto", "any", "none", "tool"
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>, // Required if type is "tool"
    },
}

impl ToolChoice {
    pub fn kind(&self) -> &str {
        match self {
            ToolChoice::String(s) => s,
            ToolChoice::Object { choice_type, .. } => choice_type,
        }
    }

    pub fn tool_name(&self) -> Option<&str> {
        match self {
            ToolChoice::String(_) => None,
            ToolChoice::Object { name, .. } => name.as_deref(),
        }
    }
}
