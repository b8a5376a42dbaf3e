use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Systems {
    String(String),
    Array(Vec<System>),
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum System {
    #[serde(rename = "text")]
    Text { text: String },
}

impl Systems {
    /// Text blocks joined by newline, matching the wire behavior for
    /// multi-block system prompts.
    pub fn joined_text(&self) -> String {
        match self {
            Systems::String(s) => s.clone(),
            Systems::Array(blocks) => blocks
                .iter()
                .map(|System::Text { text }| text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}
