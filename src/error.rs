//! Error handling for the snapshot server

use axum::http::StatusCode;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Credential exchange with the token endpoint failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Unknown device name (expected outcome, not exceptional)
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Provider returned a structured error payload
    #[error("SDM API error: {0}")]
    Api(String),

    /// Provider response had an unexpected shape
    #[error("Unexpected SDM response: {0}")]
    Protocol(String),

    /// Decoder or browser-session failure
    #[error("Capture failed: {0}")]
    Capture(String),

    /// Output file absent after the dispatch step
    #[error("Snapshot not persisted: {0}")]
    Persistence(String),

    /// Concurrent capture-session limit reached
    #[error("Over capacity: {0}")]
    OverCapacity(String),

    /// Config error
    #[error("Config error: {0}")]
    Config(String),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// HTTP status this error maps to at the delivery boundary
    ///
    /// Handlers build the `{success, device, error}` response body
    /// themselves; only the status comes from the error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::DeviceNotFound(_) => StatusCode::NOT_FOUND,
            Error::OverCapacity(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Auth(_) | Error::Api(_) | Error::Protocol(_) | Error::Http(_) => {
                StatusCode::BAD_GATEWAY
            }
            Error::Capture(_) | Error::Persistence(_) | Error::Config(_) | Error::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
