//! Streaming errors.

use thiserror::Error;
use workflow_sdk_http::HttpError;

/// Errors that can occur while opening or reading an event stream.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The request failed before streaming began (transport failure,
    /// error status, cancellation before a response).
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The response does not advertise an event stream.
    #[error("expected Content-Type to contain 'text/event-stream', got '{found}'")]
    ContentType {
        /// The Content-Type header as received (empty when missing).
        found: String,
    },

    /// Reading the live body failed after the stream was opened.
    #[error("Stream read error: {0}")]
    Read(String),

    /// A single line grew beyond the parser's limit.
    #[error("Line exceeds {limit} bytes")]
    LineTooLong {
        /// Maximum line length in bytes.
        limit: usize,
    },

    /// The stream was cancelled after it was opened.
    #[error("Stream cancelled")]
    Cancelled,
}

impl StreamError {
    /// HTTP status of an error-status response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http(err) => err.status_code(),
            _ => None,
        }
    }

    /// Whether the stream ended because its token was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::Http(err) => err.is_cancelled(),
            _ => false,
        }
    }
}

/// Result type for streaming operations.
pub type StreamResult<T> = Result<T, StreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StreamError::ContentType {
            found: "application/json".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "expected Content-Type to contain 'text/event-stream', got 'application/json'"
        );

        let err = StreamError::from(HttpError::status(500, "internal"));
        assert_eq!(err.to_string(), "HTTP error: 500 - internal");
    }

    #[test]
    fn test_status() {
        assert_eq!(StreamError::from(HttpError::status(409, "")).status(), Some(409));
        assert_eq!(StreamError::Cancelled.status(), None);
    }

    #[test]
    fn test_is_cancelled() {
        assert!(StreamError::Cancelled.is_cancelled());
        assert!(StreamError::from(HttpError::Cancelled).is_cancelled());
        assert!(!StreamError::Read("reset".into()).is_cancelled());
    }
}
