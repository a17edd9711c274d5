//! HTTP error mapping
//!
//! Every handler returns [`ApiResult`]; the domain error decides the status
//! code and a stable machine-readable `code`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use karaoke_common::Error;
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request that never reached the queue (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Domain or infrastructure error from the queue service
    #[error(transparent)]
    Queue(#[from] Error),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "VALIDATION_FAILED"),
            ApiError::Queue(err) => match err {
                Error::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                Error::ValidationFailed(_) => (StatusCode::BAD_REQUEST, "VALIDATION_FAILED"),
                Error::InvalidId(_) => (StatusCode::BAD_REQUEST, "INVALID_ID"),
                Error::IncompleteOrDuplicateOrder(_) => {
                    (StatusCode::BAD_REQUEST, "INCOMPLETE_OR_DUPLICATE_ORDER")
                }
                Error::InvalidStateTransition(_) => {
                    (StatusCode::CONFLICT, "INVALID_STATE_TRANSITION")
                }
                Error::ConcurrencyConflict(_) => (StatusCode::CONFLICT, "CONCURRENCY_CONFLICT"),
                Error::Busy(_) => (StatusCode::SERVICE_UNAVAILABLE, "BUSY"),
                Error::Database(_) | Error::Io(_) | Error::Config(_) | Error::Internal(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();

        if status.is_server_error() {
            tracing::error!(code = error_code, "Request failed: {}", self);
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
