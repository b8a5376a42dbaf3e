use serde::{Deserialize, Serialize};

use crate::image_url::ImageUrl;

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Contents {
    Array(Vec<Content>),
    String(String),
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum Content {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

impl Contents {
    /// Concatenated text parts; image parts contribute nothing.
    pub fn text_parts(&self) -> String {
        match self {
            Contents::String(s) => s.clone(),
            Contents::Array(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    Content::Text { text } => Some(text.as_str()),
                    Content::ImageUrl { .. } => None,
                })
                .collect(),
        }
    }
}
