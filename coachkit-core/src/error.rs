//! Error types for coachkit-core

use thiserror::Error;

/// Main error type for the coachkit-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Reply backend error (network, HTTP status, malformed response)
    #[error("backend error: {0}")]
    Backend(String),

    /// A submission failed schema validation
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// Tool instance not found in the registry
    #[error("tool instance not found: {0}")]
    ToolNotFound(String),

    /// Message not found in the transcript
    #[error("message not found: {0}")]
    MessageNotFound(String),

    /// A reply is already in flight for this session
    #[error("a message is already being sent")]
    SendInFlight,
}

impl Error {
    /// Shorthand for a validation failure on a named field.
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Result type alias for coachkit-core
pub type Result<T> = std::result::Result<T, Error>;
