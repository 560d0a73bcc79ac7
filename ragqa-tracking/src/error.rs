//! Error types for experiment tracking.

use thiserror::Error;

/// Errors raised by tracking stores and the run tracker.
#[derive(Debug, Error)]
pub enum TrackingError {
    /// Reading or writing the local tracking directory failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Tracking metadata could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The tracking server could not be reached.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The tracking server rejected a request.
    #[error("Tracking server returned {status} ({code}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// MLflow error code, e.g. `INVALID_PARAMETER_VALUE`.
        code: String,
        /// Server-provided message.
        message: String,
    },

    /// A parameter key or value failed validation.
    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    /// The tracking URI is malformed or uses an unsupported scheme.
    #[error("Invalid tracking URI '{uri}': {reason}")]
    InvalidUri {
        /// The offending URI.
        uri: String,
        /// Why it was rejected.
        reason: String,
    },

    /// An experiment or run does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The run's artifact location cannot be written by this client.
    #[error("Unsupported artifact location: {0}")]
    UnsupportedArtifactLocation(String),
}

/// Result type for tracking operations.
pub type Result<T> = std::result::Result<T, TrackingError>;
