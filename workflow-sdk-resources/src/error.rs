//! Resource client errors.

use thiserror::Error;
use workflow_sdk_http::HttpError;

/// Errors returned by the resource clients.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The exchange with the service failed.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// A namespace label contains a period.
    #[error("Invalid namespace label '{0}': namespace labels cannot contain periods ('.')")]
    InvalidNamespace(String),

    /// A request payload could not be encoded.
    #[error("Payload encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ResourceError {
    /// HTTP status of an error-status response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http(err) => err.status_code(),
            _ => None,
        }
    }
}

/// Result type for resource operations.
pub type ResourceResult<T> = Result<T, ResourceError>;
