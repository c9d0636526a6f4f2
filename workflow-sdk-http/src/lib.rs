//! # workflow-sdk-http
//!
//! HTTP plumbing for the workflow-sdk.
//!
//! This crate owns everything that touches the wire below the event-stream
//! layer: the [`Transport`] abstraction, the reqwest-backed
//! [`HttpTransport`], live response bodies ([`ByteStream`]), client
//! configuration and the buffered JSON exchange ([`HttpClient`]).
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use workflow_sdk_http::{CallOptions, ClientConfig, HttpClient, HttpTransport};
//!
//! let config = ClientConfig::from_env()?;
//! let client = HttpClient::new(Arc::new(HttpTransport::new(config)));
//!
//! let info: serde_json::Value = client.get("/info", &[], &CallOptions::new()).await?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod body;
pub mod client;
pub mod config;
pub mod error;
pub mod memory;
pub mod method;
pub mod transport;

// Re-exports
pub use body::ByteStream;
pub use client::{CallOptions, HttpClient};
pub use config::{ClientConfig, Framing};
pub use error::{HttpError, HttpResult};
pub use memory::{LiveBody, MemoryTransport};
pub use method::Method;
pub use transport::{
    merge_headers, HttpTransport, ResponseBody, ResponseMode, ResponseObserver, Transport,
    TransportRequest, TransportResponse, EVENT_STREAM,
};

/// Re-exported so callers can build tokens without a direct dependency.
pub use tokio_util::sync::CancellationToken;
