//! # workflow-sdk-streaming
//!
//! Event streams from the workflow service.
//!
//! A [`StreamSession`] sends a streaming request, validates the response
//! (status below 400, `Content-Type` containing `text/event-stream`) and
//! hands the live body to a background task that frames it into
//! [`StreamEvent`]s.
//!
//! ## Core Concepts
//!
//! - **[`StreamSession`]**: Opens streams; failures before streaming are returned directly
//! - **[`EventStream`]**: Ordered events plus the [`ErrorSignal`] for failures after open
//! - **[`FrameParser`]**: Incremental line framing of the body
//! - **[`StreamRequest`]**: Method, path, body, headers and cancellation token
//!
//! ## Example
//!
//! ```ignore
//! use workflow_sdk_streaming::{StreamRequest, StreamSession};
//! use serde_json::json;
//!
//! let session = StreamSession::new(transport);
//! let mut stream = session
//!     .open(StreamRequest::post("/runs/stream", json!({"assistant_id": "agent"})))
//!     .await?;
//!
//! while let Some(event) = stream.recv().await {
//!     println!("{}: {}", event.event, event.data);
//! }
//!
//! if let Some(err) = stream.error() {
//!     eprintln!("stream failed: {err}");
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod event;
pub mod frame;
pub mod request;
pub mod session;

// Re-exports
pub use error::{StreamError, StreamResult};
pub use event::StreamEvent;
pub use frame::{parse_json_line, FrameParser, MAX_LINE_LEN};
pub use request::StreamRequest;
pub use session::{ErrorSignal, EventStream, StreamSession};
pub use workflow_sdk_http::Framing;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        EventStream, Framing, StreamError, StreamEvent, StreamRequest, StreamResult,
        StreamSession,
    };
}
