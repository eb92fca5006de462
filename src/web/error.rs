use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

use crate::launcher::LaunchError;
use crate::store::StorageError;

#[derive(Debug, Error)]
pub enum WebError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Offline: {0}")]
    Offline(String),
    #[error("Question generation failed: {0}")]
    GenerationFailed(String),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Internal server error: {0}")]
    InternalServerError(String),
    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),
}

impl From<LaunchError> for WebError {
    fn from(error: LaunchError) -> Self {
        match error {
            LaunchError::InvalidSettings(msg) => WebError::BadRequest(msg),
            LaunchError::Offline => WebError::Offline(error.to_string()),
            LaunchError::Generation(ref ai) => {
                WebError::GenerationFailed(ai.user_message().to_string())
            }
            LaunchError::EmptyPool => WebError::GenerationFailed(error.to_string()),
            LaunchError::Storage(e) => WebError::Storage(e),
        }
    }
}

impl WebError {
    fn code(&self) -> &'static str {
        match self {
            WebError::BadRequest(_) => "bad_request",
            WebError::NotFound(_) => "not_found",
            WebError::Offline(_) => "offline",
            WebError::GenerationFailed(_) => "generation_failed",
            WebError::Storage(StorageError::Full { .. }) => "storage_full",
            WebError::Storage(_) => "storage",
            WebError::InternalServerError(_) | WebError::JsonSerialization(_) => "internal",
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            WebError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            WebError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            WebError::Offline(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            WebError::GenerationFailed(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            WebError::Storage(StorageError::Full { .. }) => (
                StatusCode::INSUFFICIENT_STORAGE,
                "Storage is full. Try clearing the question cache.".to_string(),
            ),
            WebError::Storage(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            WebError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            WebError::JsonSerialization(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("JSON error: {}", err),
            ),
        };

        let body = Json(json!({
            "error": error_message,
            "code": self.code(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type Result<T, E = WebError> = std::result::Result<T, E>;
