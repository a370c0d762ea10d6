//! Maps domain errors onto HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use hatchup_core::HatchupError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    detail: String,
}

/// Handler error wrapper around [`HatchupError`].
///
/// Store and internal failures are logged in full and answered with a generic
/// message.
#[derive(Debug)]
pub struct ApiError(pub HatchupError);

impl From<HatchupError> for ApiError {
    fn from(err: HatchupError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status_and_detail(&self) -> (StatusCode, String) {
        match &self.0 {
            HatchupError::AuthenticationRequired(message) => {
                (StatusCode::UNAUTHORIZED, message.clone())
            }
            HatchupError::NotFound { entity_type, .. } => {
                (StatusCode::NOT_FOUND, format!("{entity_type} not found"))
            }
            HatchupError::InvalidInput(message) => (StatusCode::BAD_REQUEST, message.clone()),
            HatchupError::Config(message) => (StatusCode::INTERNAL_SERVER_ERROR, message.clone()),
            HatchupError::CompletionService(_) => (
                StatusCode::BAD_GATEWAY,
                "Completion service unavailable".to_string(),
            ),
            HatchupError::ToolUnavailable { .. } | HatchupError::OrchestratorUnavailable(_) => (
                StatusCode::BAD_GATEWAY,
                "Research tools unavailable".to_string(),
            ),
            HatchupError::Io { .. }
            | HatchupError::DataAccess(_)
            | HatchupError::Serialization { .. }
            | HatchupError::Migration(_)
            | HatchupError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = self.status_and_detail();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "[ApiError] {}", self.0);
        } else {
            tracing::debug!(status = status.as_u16(), "[ApiError] {}", self.0);
        }
        (status, Json(ErrorResponse { detail })).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
