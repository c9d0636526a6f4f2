//! In-memory transport for testing.
//!
//! [`MemoryTransport`] records every request and replays scripted responses
//! in order. [`LiveBody`] produces a [`ByteStream`] fed chunk by chunk from
//! the test, and counts how many times the stream was released.

use crate::body::ByteStream;
use crate::error::{HttpError, HttpResult};
use crate::transport::{ResponseBody, Transport, TransportRequest, TransportResponse};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Transport that replays scripted responses.
#[derive(Default)]
pub struct MemoryTransport {
    responses: Mutex<VecDeque<HttpResult<TransportResponse>>>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl MemoryTransport {
    /// Create an empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response.
    pub fn push_response(&self, response: TransportResponse) {
        self.responses.lock().push_back(Ok(response));
    }

    /// Queue a transport failure.
    pub fn push_error(&self, error: HttpError) {
        self.responses.lock().push_back(Err(error));
    }

    /// Queue a buffered JSON response.
    pub fn respond_json(&self, status: u16, body: &serde_json::Value) {
        let bytes = Bytes::from(body.to_string());
        self.push_response(buffered(status, Some("application/json"), bytes));
    }

    /// Queue a buffered text response.
    pub fn respond_text(&self, status: u16, body: impl Into<String>) {
        let bytes = Bytes::from(body.into());
        self.push_response(buffered(status, Some("text/plain"), bytes));
    }

    /// Queue a live response with the given content type.
    pub fn respond_stream(&self, status: u16, content_type: Option<&str>, body: ByteStream) {
        self.push_response(TransportResponse {
            status,
            headers: headers_with(content_type),
            body: ResponseBody::Streaming(body),
        });
    }

    /// Recorded requests, oldest first.
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().clone()
    }

    /// The most recent request.
    pub fn last_request(&self) -> Option<TransportRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn execute(
        &self,
        request: TransportRequest,
        cancel: &CancellationToken,
    ) -> HttpResult<TransportResponse> {
        self.requests.lock().push(request);

        if cancel.is_cancelled() {
            return Err(HttpError::Cancelled);
        }

        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(HttpError::Transport("no scripted response".to_string())))
    }
}

fn headers_with(content_type: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Some(value) = content_type.and_then(|ct| HeaderValue::from_str(ct).ok()) {
        headers.insert(CONTENT_TYPE, value);
    }
    headers
}

fn buffered(status: u16, content_type: Option<&str>, body: Bytes) -> TransportResponse {
    TransportResponse {
        status,
        headers: headers_with(content_type),
        body: ResponseBody::Buffered(body),
    }
}

/// Test-side handle of a live body.
///
/// The body ends with EOF when [`LiveBody::end`] is called or every clone of
/// the handle is dropped.
#[derive(Debug, Clone)]
pub struct LiveBody {
    tx: Arc<Mutex<Option<mpsc::UnboundedSender<io::Result<Bytes>>>>>,
    releases: Arc<AtomicUsize>,
}

impl LiveBody {
    /// Create a handle and the stream it feeds.
    pub fn channel() -> (Self, ByteStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        let releases = Arc::new(AtomicUsize::new(0));

        let inner = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
        .boxed();

        let stream = ByteStream::new(Counted {
            inner,
            releases: Arc::clone(&releases),
        });

        let tx = Arc::new(Mutex::new(Some(tx)));
        (Self { tx, releases }, stream)
    }

    /// Send a raw chunk. Returns false once the stream has been released or ended.
    pub fn send(&self, chunk: impl Into<Bytes>) -> bool {
        self.push(Ok(chunk.into()))
    }

    /// Send a line terminated by `\n`.
    pub fn send_line(&self, line: &str) -> bool {
        self.send(format!("{line}\n"))
    }

    /// Make the next read fail.
    pub fn fail(&self, error: io::Error) -> bool {
        self.push(Err(error))
    }

    /// End the body; reads after the queued chunks see EOF.
    pub fn end(&self) {
        self.tx.lock().take();
    }

    /// How many times the stream was released (0 or 1).
    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    /// Whether the consuming side has released the stream.
    pub fn is_released(&self) -> bool {
        self.release_count() > 0
    }

    fn push(&self, item: io::Result<Bytes>) -> bool {
        self.tx
            .lock()
            .as_ref()
            .is_some_and(|tx| tx.send(item).is_ok())
    }
}

struct Counted {
    inner: BoxStream<'static, io::Result<Bytes>>,
    releases: Arc<AtomicUsize>,
}

impl Stream for Counted {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl Drop for Counted {
    fn drop(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}
