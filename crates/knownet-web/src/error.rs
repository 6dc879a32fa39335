//! HTTP error mapping for handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use knownet_common::error::KnownetError;
use knownet_llm::LlmError;

/// Error returned by API handlers; renders as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::warn!(status = %self.status, "{}", self.message);
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<KnownetError> for ApiError {
    fn from(err: KnownetError) -> Self {
        let status = match &err {
            KnownetError::EntityNotFound(_) | KnownetError::SessionNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            KnownetError::Parse(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl From<LlmError> for ApiError {
    fn from(err: LlmError) -> Self {
        let status = match &err {
            LlmError::MissingApiKey(_) => StatusCode::UNAUTHORIZED,
            LlmError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            LlmError::ApiError { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            _ => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, err.to_string())
    }
}
