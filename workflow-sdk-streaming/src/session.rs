//! Stream sessions.
//!
//! [`StreamSession::open`] issues a streaming request and either fails
//! straight away or hands back an [`EventStream`]. Never both: once the
//! stream is returned every later failure arrives on its [`ErrorSignal`].
//!
//! Each open stream owns one background task. The task is the only reader
//! of the response body and the only sender on the event channel. On every
//! exit path it closes the body first, then reports at most one error, then
//! closes the error signal and finally the event channel, so a consumer that
//! sees the channel end can read the outcome without waiting.

use crate::error::{StreamError, StreamResult};
use crate::event::StreamEvent;
use crate::frame::FrameParser;
use crate::request::StreamRequest;
use futures::{Stream, StreamExt};
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use workflow_sdk_http::{
    ByteStream, ClientConfig, Framing, HttpError, ResponseObserver, Transport, EVENT_STREAM,
};

/// Opens event streams over a [`Transport`].
#[derive(Clone)]
pub struct StreamSession {
    transport: Arc<dyn Transport>,
    buffer: usize,
    framing: Framing,
    observer: Option<ResponseObserver>,
}

impl StreamSession {
    /// Create a session with a one-slot event channel and line-per-event framing.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            buffer: 1,
            framing: Framing::default(),
            observer: None,
        }
    }

    /// Create a session using the buffer size and framing of `config`.
    pub fn from_config(transport: Arc<dyn Transport>, config: &ClientConfig) -> Self {
        Self::new(transport)
            .with_buffer(config.event_buffer)
            .with_framing(config.framing)
    }

    /// Set the event channel capacity (at least 1).
    #[must_use]
    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer.max(1);
        self
    }

    /// Set the framing.
    #[must_use]
    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    /// Call `observer` with the status and headers of every response.
    #[must_use]
    pub fn with_observer(mut self, observer: ResponseObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Event channel capacity.
    pub fn buffer(&self) -> usize {
        self.buffer
    }

    /// Framing used for new streams.
    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// Open a stream.
    ///
    /// Fails with [`StreamError::Http`] when the transport fails or the
    /// status is 400 or above, and with [`StreamError::ContentType`] when the
    /// response is not an event stream. In both status and content-type
    /// cases the body is closed before returning.
    pub async fn open(&self, request: StreamRequest) -> StreamResult<EventStream> {
        let (request, cancel) = request.into_transport();
        let method = request.method;
        let path = request.path.clone();
        debug!(%method, %path, "Opening stream");

        let response = self.transport.execute(request, &cancel).await?;

        if let Some(observer) = &self.observer {
            observer(response.status, &response.headers);
        }

        let status = response.status;
        if response.is_error() {
            let body = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(HttpError::Cancelled.into()),
                body = response.bytes() => body,
            };
            warn!(status, %path, "Stream request rejected");
            return Err(HttpError::status(status, String::from_utf8_lossy(&body).into_owned()).into());
        }

        let found = response.content_type().unwrap_or_default().to_string();
        let mut body = response.into_stream();
        if !found.to_ascii_lowercase().contains(EVENT_STREAM) {
            body.close();
            warn!(content_type = %found, %path, "Response is not an event stream");
            return Err(StreamError::ContentType { found });
        }

        let (events_tx, events_rx) = mpsc::channel(self.buffer);
        let (error_tx, error_rx) = oneshot::channel();

        let pump = Pump {
            body,
            parser: FrameParser::new(self.framing),
            events: events_tx,
            cancel,
            delivered: 0,
        };
        tokio::spawn(pump.run(error_tx, path));

        Ok(EventStream {
            events: events_rx,
            error: ErrorSignal::new(error_rx),
        })
    }
}

impl fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSession")
            .field("buffer", &self.buffer)
            .field("framing", &self.framing)
            .field("observer", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}

enum Exit {
    Finished,
    ConsumerGone,
    Failed(StreamError),
}

/// Background reader of one stream.
struct Pump {
    body: ByteStream,
    parser: FrameParser,
    events: mpsc::Sender<StreamEvent>,
    cancel: CancellationToken,
    delivered: usize,
}

impl Pump {
    async fn run(mut self, error_tx: oneshot::Sender<StreamError>, path: String) {
        let exit = self.pump().await;

        let Pump {
            mut body,
            events,
            delivered,
            ..
        } = self;

        body.close();

        match exit {
            Exit::Finished => {
                debug!(%path, delivered, "Stream finished");
                drop(error_tx);
            }
            Exit::ConsumerGone => {
                debug!(%path, delivered, "Stream consumer went away");
                drop(error_tx);
            }
            Exit::Failed(err) => {
                debug!(%path, delivered, error = %err, "Stream ended with error");
                let _ = error_tx.send(err);
            }
        }

        // The event channel closes last.
        drop(events);
    }

    async fn pump(&mut self) -> Exit {
        loop {
            let chunk = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Exit::Failed(StreamError::Cancelled),
                _ = self.events.closed() => return Exit::ConsumerGone,
                chunk = self.body.next() => chunk,
            };

            let (fed, at_end) = match chunk {
                Some(Ok(bytes)) => (self.parser.feed(&bytes), false),
                Some(Err(e)) => return Exit::Failed(StreamError::Read(e.to_string())),
                None => (self.parser.finish(), true),
            };

            while let Some(event) = self.parser.next_event() {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return Exit::Failed(StreamError::Cancelled),
                    sent = self.events.send(event) => {
                        if sent.is_err() {
                            return Exit::ConsumerGone;
                        }
                    }
                }
                self.delivered += 1;
            }

            if let Err(err) = fed {
                return Exit::Failed(err);
            }
            if at_end {
                return Exit::Finished;
            }
        }
    }
}

/// Single-slot signal carrying the error that ended a stream, if any.
#[derive(Debug)]
pub struct ErrorSignal {
    rx: Option<oneshot::Receiver<StreamError>>,
}

impl ErrorSignal {
    fn new(rx: oneshot::Receiver<StreamError>) -> Self {
        Self { rx: Some(rx) }
    }

    /// Take the error without waiting.
    ///
    /// Returns `None` while the stream is still running, when it ended
    /// cleanly, and after the error has been taken once.
    pub fn try_take(&mut self) -> Option<StreamError> {
        let rx = self.rx.as_mut()?;
        match rx.try_recv() {
            Ok(err) => {
                self.rx = None;
                Some(err)
            }
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => {
                self.rx = None;
                None
            }
        }
    }

    /// Wait until the stream has ended and return its outcome.
    ///
    /// An error already taken with [`ErrorSignal::try_take`] is not reported again.
    pub async fn wait(self) -> StreamResult<()> {
        match self.rx {
            Some(rx) => match rx.await {
                Ok(err) => Err(err),
                Err(_) => Ok(()),
            },
            None => Ok(()),
        }
    }
}

/// A live event stream returned by [`StreamSession::open`].
///
/// Events arrive in wire order. When [`EventStream::recv`] returns `None` the
/// body is already closed and the outcome is available from
/// [`EventStream::error`]. Dropping the stream stops its background task.
#[derive(Debug)]
pub struct EventStream {
    events: mpsc::Receiver<StreamEvent>,
    error: ErrorSignal,
}

impl EventStream {
    /// Receive the next event; `None` once the stream has ended.
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.events.recv().await
    }

    /// Take the error that ended the stream, without waiting.
    pub fn error(&mut self) -> Option<StreamError> {
        self.error.try_take()
    }

    /// Discard remaining events and return the outcome.
    pub async fn finish(mut self) -> StreamResult<()> {
        while self.events.recv().await.is_some() {}
        self.error.wait().await
    }

    /// Receive every remaining event, failing if the stream ended with an error.
    pub async fn collect_events(mut self) -> StreamResult<Vec<StreamEvent>> {
        let mut collected = Vec::new();
        while let Some(event) = self.events.recv().await {
            collected.push(event);
        }
        self.error.wait().await?;
        Ok(collected)
    }

    /// Split into the raw event receiver and the error signal.
    pub fn split(self) -> (mpsc::Receiver<StreamEvent>, ErrorSignal) {
        (self.events, self.error)
    }
}

impl Stream for EventStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.poll_recv(cx)
    }
}
