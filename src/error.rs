use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::repository::StoreError;

/// AppError
///
/// The tagged application error: a hand-authored message paired with the HTTP status
/// it should surface as. Constructed at the point a business rule is violated and never
/// mutated afterwards. The message is safe to show to clients verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct AppError {
    message: String,
    status: StatusCode,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status,
        }
    }

    /// 400 raised by the Validation Gate and by malformed input.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Duplicate unique value (e.g. an email that is already taken). Reported as 400.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

/// ApiError
///
/// Every failure a gate or handler can produce. Only the `App` variant carries a
/// client-visible message; the other variants collapse to fixed generic strings
/// when rendered.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    App(#[from] AppError),

    #[error("data store failure: {0}")]
    Store(#[from] StoreError),

    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl ApiError {
    /// Wraps any displayable low-level failure (hashing, token signing, ...) as unclassified.
    pub fn unexpected(err: impl std::fmt::Display) -> Self {
        Self::Unexpected(err.to_string())
    }

    /// The status code and message the normalizer will send for this error.
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::App(app) => (app.status(), app.message().to_string()),
            Self::Store(StoreError::Integrity(_)) => (
                StatusCode::BAD_REQUEST,
                "Database operation failed".to_string(),
            ),
            Self::Store(StoreError::Unavailable(_)) | Self::Unexpected(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        }
    }
}

/// ErrorBody
///
/// The uniform JSON shape of every error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    #[schema(example = "error")]
    pub status: String,
    pub message: String,
}

/// Error Normalizer
///
/// The single terminal point every failure flows through. The error is recorded to the
/// tracing sink first, then rendered as `{status: "error", message}`. Nothing in here
/// can fail, so every request ends with a well-formed JSON response.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        match &self {
            ApiError::App(_) => tracing::warn!(
                status = status.as_u16(),
                error = %self,
                context = ?self,
                "request rejected"
            ),
            _ => tracing::error!(
                status = status.as_u16(),
                error = %self,
                context = ?self,
                "request failed"
            ),
        }

        let body = ErrorBody {
            status: "error".to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        ApiError::App(self).into_response()
    }
}

/// Result alias used by every handler and gate.
pub type ApiResult<T> = Result<T, ApiError>;
