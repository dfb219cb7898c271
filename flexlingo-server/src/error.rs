//! HTTP error type for flexlingo-server
//!
//! Every failure renders as `{"error": "<message>"}`. Internal details
//! (stderr, paths, OS errors) are logged where they occur and never placed
//! in the response body.

use crate::dispatch::DispatchError;
use crate::ports::EnumerationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) | ApiError::Internal(msg) => msg,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.message() }));
        (self.status(), body).into_response()
    }
}

impl From<EnumerationError> for ApiError {
    fn from(_: EnumerationError) -> Self {
        ApiError::Internal("Failed to list serial ports".to_string())
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Validation(msg) => ApiError::BadRequest(msg),
            e @ DispatchError::NotFound(_) => ApiError::BadRequest(e.to_string()),
            DispatchError::ScriptMissing(_) => {
                ApiError::Internal("Prediction script unavailable".to_string())
            }
            DispatchError::Execution(_) => {
                ApiError::Internal("Failed to run prediction".to_string())
            }
            DispatchError::Enumeration(e) => e.into(),
        }
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
