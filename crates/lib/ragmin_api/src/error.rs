//! Application error types for the management service.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ragmin_core::FailureKind;
use ragmin_core::auth::AuthError;
use ragmin_core::store::StoreError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Body of every management error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    /// Management login rejected; rendered as `400 {code: 1}`.
    #[error("{0}")]
    LoginFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    /// Build the error matching a failure classification.
    pub fn from_kind(kind: FailureKind, message: String) -> Self {
        match kind {
            FailureKind::InvalidInput => AppError::Validation(message),
            FailureKind::Unauthenticated => AppError::Unauthorized(message),
            FailureKind::Forbidden => AppError::Forbidden(message),
            FailureKind::Conflict => AppError::Conflict(message),
            FailureKind::Upstream => AppError::Upstream(message),
            FailureKind::Storage | FailureKind::Internal => AppError::Internal(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, 400, m.as_str()),
            AppError::LoginFailed(m) => (StatusCode::BAD_REQUEST, 1, m.as_str()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, 404, m.as_str()),
            AppError::Conflict(m) => (StatusCode::CONFLICT, 409, m.as_str()),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, 401, m.as_str()),
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, 403, m.as_str()),
            AppError::Upstream(m) => (StatusCode::BAD_GATEWAY, 502, m.as_str()),
            AppError::Internal(detail) => {
                error!(%detail, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, 500, "Internal server error")
            }
        };
        let body = Json(ErrorBody {
            code,
            message: message.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::from_kind(e.kind(), e.to_string())
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        AppError::from_kind(e.kind(), e.to_string())
    }
}
