//! Live response bodies.

use bytes::{Bytes, BytesMut};
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A live, unbuffered response body.
///
/// The stream has exactly one owner. [`ByteStream::close`] releases the
/// underlying connection; it is idempotent and a closed stream yields `None`.
pub struct ByteStream {
    inner: Option<BoxStream<'static, io::Result<Bytes>>>,
}

impl ByteStream {
    /// Wrap a byte stream.
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self {
            inner: Some(stream.boxed()),
        }
    }

    /// Wrap a reqwest body stream.
    pub fn from_reqwest<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
    {
        Self::new(stream.map(|chunk| chunk.map_err(io::Error::other)))
    }

    /// A stream that yields the given chunks and then ends.
    pub fn from_chunks<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let chunks: Vec<io::Result<Bytes>> = chunks.into_iter().map(|c| Ok(c.into())).collect();
        Self::new(futures::stream::iter(chunks))
    }

    /// Release the underlying stream. Calling this more than once is a no-op.
    pub fn close(&mut self) {
        if self.inner.take().is_some() {
            tracing::trace!("response body closed");
        }
    }

    /// Whether the stream has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    /// Read the remaining body as text and close the stream.
    ///
    /// Invalid UTF-8 is replaced. A read error ends the read early with
    /// whatever text was collected so far.
    pub async fn read_to_string(&mut self) -> String {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.next().await {
            match chunk {
                Ok(bytes) => buf.extend_from_slice(&bytes),
                Err(e) => {
                    tracing::debug!(error = %e, "error body read failed");
                    break;
                }
            }
        }
        self.close();
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl Stream for ByteStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.inner.as_mut() {
            Some(inner) => inner.as_mut().poll_next(cx),
            None => Poll::Ready(None),
        }
    }
}

impl fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteStream")
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_to_string_closes() {
        let mut body = ByteStream::from_chunks(vec!["bad ", "request"]);
        assert_eq!(body.read_to_string().await, "bad request");
        assert!(body.is_closed());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let mut body = ByteStream::from_chunks(vec!["data"]);
        body.close();
        body.close();
        assert!(body.is_closed());
        assert!(body.next().await.is_none());
    }

    #[tokio::test]
    async fn test_read_error_keeps_partial_text() {
        let chunks = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
            Ok(Bytes::from_static(b"never")),
        ];
        let mut body = ByteStream::new(futures::stream::iter(chunks));
        assert_eq!(body.read_to_string().await, "partial");
    }
}
