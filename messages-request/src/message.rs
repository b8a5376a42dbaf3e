use serde::{Deserialize, Serialize};

use crate::content::Contents;

#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    #[serde(rename = "assistant")]
    Assistant { content: Contents },
    #[serde(rename = "user")]
    User { content: Contents },
}

impl Message {
    pub fn content(&self) -> &Contents {
        match self {
            Message::Assistant { content } | Message::User { content } => content,
        }
    }

    pub fn is_assistant(&self) -> bool {
        matches!(self, Message::Assistant { .. })
    }
}
