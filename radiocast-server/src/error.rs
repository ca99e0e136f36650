//! Error types for radiocast-server
//!
//! Handlers return `Result<T>`; the `IntoResponse` impl turns failures into
//! a JSON `{"error": ...}` body with a matching status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Main error type for radiocast-server
#[derive(Error, Debug)]
pub enum Error {
    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Errors bubbled up from radiocast-common
    #[error(transparent)]
    Common(#[from] radiocast_common::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Login attempted again before the rate limit window elapsed
    #[error("Too many requests")]
    TooManyRequests,

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using radiocast-server Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    fn status(&self) -> StatusCode {
        match self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::BadRequest(_) | Error::Common(radiocast_common::Error::InvalidInput(_)) => {
                StatusCode::BAD_REQUEST
            }
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
