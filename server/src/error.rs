use axum::{Json, http::StatusCode, response::IntoResponse};
use chat::error::ProviderError;
use messages_response::ErrorResponse;

/// Request failure mapped onto the protocol error envelope.
pub struct AppError {
    status: StatusCode,
    body: ErrorResponse,
}

impl AppError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorResponse::invalid_request(message),
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            body: ErrorResponse::authentication(message),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body: ErrorResponse::not_found(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Backend failures relay the upstream status code and raw body.
impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        let status = StatusCode::from_u16(err.status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let message = match err {
            ProviderError::Upstream { body, .. } => body,
            ProviderError::Transport(e) => e.to_string(),
        };

        Self {
            status,
            body: ErrorResponse::api_error(message),
        }
    }
}

/// Anything uncaught during translation surfaces as a 500-class api_error
/// instead of an unhandled fault.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorResponse::api_error(err.to_string()),
        }
    }
}
