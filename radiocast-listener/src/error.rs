//! Error types for radiocast-listener

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Server returned status {0}")]
    Status(u16),

    /// Response body was not the expected JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Push channel ended or misbehaved
    #[error("Push channel error: {0}")]
    Stream(String),

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
