use serde::{Deserialize, Serialize};

/// Error envelope returned on every non-success path:
/// `{"type": "error", "error": {"type": ..., "message": ...}}`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorResponse {
    #[serde(rename = "type")]
    pub response_type: String, // "error"
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: impl Into<String>) -> Self {
        Self {
            response_type: "error".to_string(),
            error: ErrorDetail {
                error_type: error_type.to_string(),
                message: message.into(),
            },
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new("invalid_request_error", message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new("authentication_error", message)
    }

    pub fn api_error(message: impl Into<String>) -> Self {
        Self::new("api_error", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("not_found", message)
    }
}

impl ErrorDetail {
    pub fn api_error(message: impl Into<String>) -> Self {
        Self {
            error_type: "api_error".to_string(),
            message: message.into(),
        }
    }
}
