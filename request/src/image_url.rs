use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

impl ImageUrl {
    /// Inline `data:` URL from a media type and already-encoded base64 data.
    pub fn from_base64(media_type: &str, data: &str) -> Self {
        Self {
            url: format!("data:{media_type};base64,{data}"),
        }
    }
}
