//! # workflow-sdk
//!
//! Async client for workflow execution services.
//!
//! The centerpiece is the event stream: a run's progress is delivered as an
//! HTTP event stream that [`WorkflowClient::stream`] turns into ordered
//! [`StreamEvent`]s, with failures after the stream opened reported on a
//! separate error signal. Cron jobs and the item store are plain JSON
//! exchanges.
//!
//! ## Quick Start
//!
//! ```ignore
//! use workflow_sdk::prelude::*;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = WorkflowClient::from_env()?;
//!
//!     let mut stream = client
//!         .stream(StreamRequest::post(
//!             "/threads/t-1/runs/stream",
//!             json!({"assistant_id": "agent", "input": {}}),
//!         ))
//!         .await?;
//!
//!     while let Some(event) = stream.recv().await {
//!         println!("{}: {}", event.event, event.data);
//!     }
//!     if let Some(err) = stream.error() {
//!         return Err(err.into());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`workflow_sdk_http`] - Transport, configuration and JSON exchange
//! - [`workflow_sdk_streaming`] - Event-stream sessions and framing
//! - [`workflow_sdk_resources`] - Cron and store clients

#![warn(missing_docs)]
#![deny(unsafe_code)]

use std::sync::Arc;
use tracing::debug;

pub use workflow_sdk_http as http;
pub use workflow_sdk_resources as resources;
pub use workflow_sdk_streaming as streaming;

pub use workflow_sdk_http::{
    CallOptions, CancellationToken, ClientConfig, Framing, HttpClient, HttpError, HttpResult,
    HttpTransport, Method, ResponseObserver, Transport,
};
pub use workflow_sdk_resources::{
    CreateCron, Cron, CronSearch, CronsClient, Item, ListNamespaceResponse, ListNamespaces,
    MultitaskStrategy, PutItem, ResourceError, ResourceResult, Run, RunStatus, SearchItems,
    SearchItemsResponse, StoreClient,
};
pub use workflow_sdk_streaming::{
    ErrorSignal, EventStream, StreamError, StreamEvent, StreamRequest, StreamResult,
    StreamSession,
};

/// Client bundling every resource over one shared transport.
#[derive(Debug, Clone)]
pub struct WorkflowClient {
    config: ClientConfig,
    http: HttpClient,
    session: StreamSession,
    crons: CronsClient,
    store: StoreClient,
}

impl WorkflowClient {
    /// Create a client talking HTTP to `config.base_url`.
    pub fn new(config: ClientConfig) -> Self {
        let transport = Arc::new(HttpTransport::new(config.clone()));
        Self::with_transport(transport, config)
    }

    /// Create a client from `WORKFLOW_API_URL` and friends.
    pub fn from_env() -> HttpResult<Self> {
        Ok(Self::new(ClientConfig::from_env()?))
    }

    /// Create a client over a custom transport.
    ///
    /// The transport is responsible for the base URL and default headers;
    /// `config` supplies the stream buffer and framing.
    pub fn with_transport(transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        debug!(base_url = %config.base_url, framing = ?config.framing, "Creating workflow client");
        let http = HttpClient::new(Arc::clone(&transport));
        let session = StreamSession::from_config(transport, &config);
        Self {
            crons: CronsClient::new(http.clone()),
            store: StoreClient::new(http.clone()),
            config,
            http,
            session,
        }
    }

    /// Call `observer` with the status and headers of every response,
    /// streamed or not.
    #[must_use]
    pub fn with_observer(mut self, observer: ResponseObserver) -> Self {
        self.http = self.http.with_observer(Arc::clone(&observer));
        self.session = self.session.with_observer(observer);
        self.crons = CronsClient::new(self.http.clone());
        self.store = StoreClient::new(self.http.clone());
        self
    }

    /// The configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The JSON exchange.
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// The stream session.
    pub fn session(&self) -> &StreamSession {
        &self.session
    }

    /// Cron jobs.
    pub fn crons(&self) -> &CronsClient {
        &self.crons
    }

    /// The item store.
    pub fn store(&self) -> &StoreClient {
        &self.store
    }

    /// Open an event stream.
    pub async fn stream(&self, request: StreamRequest) -> StreamResult<EventStream> {
        self.session.open(request).await
    }

    /// Check that the service is reachable.
    pub async fn check_connection(&self) -> HttpResult<()> {
        self.http.check_connection().await
    }
}

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        CallOptions, CancellationToken, ClientConfig, CreateCron, CronSearch, EventStream,
        Framing, HttpError, ListNamespaces, Method, PutItem, ResourceError, SearchItems,
        StreamError, StreamEvent, StreamRequest, WorkflowClient,
    };
}
