//! Response envelopes.
//!
//! The management service answers `{code, data?, message}` with `code = 0` on
//! success. The user application always answers HTTP 200 with
//! `{code, message, data}` and a numeric return code.

use axum::Json;
use axum::response::{IntoResponse, Response};
use ragmin_core::auth::AuthError;
use ragmin_core::store::StoreError;
use serde::Serialize;
use serde_json::Value;
use tracing::error;

/// Successful management response.
#[derive(Debug, Serialize)]
pub struct ApiReply<T: Serialize> {
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub message: String,
}

impl<T: Serialize> ApiReply<T> {
    pub fn data(data: T, message: &str) -> Json<Self> {
        Json(Self {
            code: 0,
            data: Some(data),
            message: message.to_string(),
        })
    }
}

impl ApiReply<()> {
    pub fn message(message: &str) -> Json<Self> {
        Json(Self {
            code: 0,
            data: None,
            message: message.to_string(),
        })
    }
}

/// User application return codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetCode {
    Success = 0,
    ExceptionError = 100,
    ArgumentError = 101,
    DataError = 102,
    AuthenticationError = 109,
}

/// User application response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonResult {
    pub code: i32,
    pub message: String,
    pub data: Value,
}

impl JsonResult {
    pub fn ok(data: impl Serialize) -> Self {
        Self {
            code: RetCode::Success as i32,
            message: "success".to_string(),
            data: serde_json::to_value(data).unwrap_or_default(),
        }
    }

    pub fn error(code: RetCode, message: impl Into<String>) -> Self {
        Self {
            code: code as i32,
            message: message.into(),
            data: Value::Bool(false),
        }
    }

    pub fn argument_error(message: impl Into<String>) -> Self {
        Self::error(RetCode::ArgumentError, message)
    }

    pub fn data_error(message: impl Into<String>) -> Self {
        Self::error(RetCode::DataError, message)
    }
}

impl IntoResponse for JsonResult {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

impl From<StoreError> for JsonResult {
    fn from(e: StoreError) -> Self {
        error!(error = %e, "user app storage failure");
        JsonResult::error(RetCode::ExceptionError, e.to_string())
    }
}

impl From<AuthError> for JsonResult {
    fn from(e: AuthError) -> Self {
        error!(error = %e, "user app auth failure");
        JsonResult::error(RetCode::ExceptionError, e.to_string())
    }
}
