//! Events delivered by a stream session.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// One record of an event stream.
///
/// `data` and `metadata` are passed through as text; interpreting them is
/// up to the consumer. A session never delivers an event whose three
/// fields are all empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEvent {
    /// Event type tag.
    pub event: String,
    /// Payload, usually JSON text.
    pub data: String,
    /// Side-channel JSON text.
    pub metadata: String,
}

impl StreamEvent {
    /// Create an event with just a type tag.
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            ..Default::default()
        }
    }

    /// Set the payload.
    #[must_use]
    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = data.into();
        self
    }

    /// Set the metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = metadata.into();
        self
    }

    /// True when all three fields are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.event.is_empty() && self.data.is_empty() && self.metadata.is_empty()
    }

    /// Parse the payload as JSON.
    pub fn parse_data<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.data)
    }

    /// Parse the metadata as JSON.
    pub fn parse_metadata<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.metadata)
    }
}
