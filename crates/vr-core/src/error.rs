//! # VerityError
//!
//! Centralized error handling for the verity client.
//! Maps gateway and configuration failures to actionable error types.

use thiserror::Error;

/// The primary error type for all verity operations.
#[derive(Error, Debug)]
pub enum VerityError {
    /// The request never produced a response (DNS, refused connection, timeout).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    /// `message` carries the `message` field of the error body when present.
    #[error("server responded with status {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Status { status: u16, message: Option<String> },

    /// Entity absent locally (e.g., commenting on an unknown news item)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Response body could not be turned into the expected shape
    #[error("malformed response: {0}")]
    Decode(String),

    /// Caller asked for something the contract forbids
    #[error("validation error: {0}")]
    Validation(String),

    /// Bad base URL, unreadable settings, etc.
    #[error("configuration error: {0}")]
    Config(String),
}

impl VerityError {
    /// The human-readable message the server attached to a failed response.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            VerityError::Status { message, .. } => message.as_deref().filter(|m| !m.trim().is_empty()),
            _ => None,
        }
    }

    pub fn not_found(kind: &str, id: impl ToString) -> Self {
        VerityError::NotFound(kind.to_string(), id.to_string())
    }
}

/// A specialized Result type for verity logic.
pub type Result<T> = std::result::Result<T, VerityError>;
