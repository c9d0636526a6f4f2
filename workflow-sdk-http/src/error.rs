//! HTTP exchange errors.

use thiserror::Error;

/// Errors that can occur while talking to the workflow service.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The request never produced a response (connect, DNS, IO).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The service answered with a status code of 400 or above.
    #[error("HTTP error: {status} - {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The request was cancelled through its cancellation token.
    #[error("Request cancelled")]
    Cancelled,

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration could not be loaded or is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A header name or value is not valid HTTP.
    #[error("Invalid header '{name}': {reason}")]
    InvalidHeader {
        /// Header name as given.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The method name is not one of GET, POST, PUT, PATCH, DELETE.
    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),
}

impl HttpError {
    /// Create a status error.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// Create a transport error from anything displayable.
    pub fn transport<E: std::fmt::Display>(err: E) -> Self {
        Self::Transport(err.to_string())
    }

    /// Get the HTTP status if the service answered with an error status.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if the error is a cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<reqwest::Error> for HttpError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Transport(format!("failed to decode response body: {err}"))
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Result type for HTTP operations.
pub type HttpResult<T> = Result<T, HttpError>;
