//! Chat failure taxonomy and its HTTP rendering

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Every way a chat operation can fail
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("No message provided")]
    EmptyMessage,

    #[error("Invalid model selected: {0}")]
    InvalidModel(String),

    /// Non-success status from the completion endpoint
    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error("Upstream did not respond within {0}s")]
    UpstreamTimeout(u64),

    #[error("Failed to reach upstream: {0}")]
    UpstreamUnavailable(String),

    /// Success status but a body without `choices[0].message.content`
    #[error("Upstream returned an unexpected response: {0}")]
    UpstreamProtocol(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChatError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ChatError::EmptyMessage | ChatError::InvalidModel(_) => StatusCode::BAD_REQUEST,
            ChatError::Upstream { .. }
            | ChatError::UpstreamUnavailable(_)
            | ChatError::UpstreamProtocol(_) => StatusCode::BAD_GATEWAY,
            ChatError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ChatError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True for failures caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
