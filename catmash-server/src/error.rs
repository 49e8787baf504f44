//! HTTP error mapping
//!
//! Core errors keep their stable code; the HTTP layer only picks the status.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use catmash_common::Error;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed voter identity (401)
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Authenticated but not allowed (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// catmash-common error
    #[error(transparent)]
    Core(#[from] Error),
}

fn core_status(err: &Error) -> StatusCode {
    match err {
        Error::NotFound(_) | Error::NoActiveSession(_) => StatusCode::NOT_FOUND,
        Error::InsufficientCandidates { .. } | Error::EmptyPool => StatusCode::UNPROCESSABLE_ENTITY,
        Error::DuplicateVote { .. } | Error::ConcurrencyConflict(_) => StatusCode::CONFLICT,
        Error::WinnerNotInPair(_) | Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::Config(_) | Error::Database(_) | Error::Io(_) | Error::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Core(err) => core_status(err),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated(_) => "UNAUTHENTICATED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Core(err) => err.code(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
