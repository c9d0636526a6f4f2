//! Transport abstraction and the reqwest-backed implementation.

use crate::body::ByteStream;
use crate::config::ClientConfig;
use crate::error::{HttpError, HttpResult};
use crate::method::Method;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Content type advertised by event-stream responses.
pub const EVENT_STREAM: &str = "text/event-stream";

/// Observer invoked with the status and headers of every response.
pub type ResponseObserver = Arc<dyn Fn(u16, &HeaderMap) + Send + Sync>;

/// Whether the response body is read up front or handed over live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    /// Read the whole body before returning.
    #[default]
    Buffered,
    /// Return the body as a live [`ByteStream`].
    Streaming,
}

/// A request as seen by a [`Transport`].
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the service base URL.
    pub path: String,
    /// Query parameters, in order.
    pub query: Vec<(String, String)>,
    /// Request headers. Later entries win over earlier ones with the same name.
    pub headers: Vec<(String, String)>,
    /// JSON body.
    pub body: Option<Value>,
    /// Body handling mode.
    pub mode: ResponseMode,
}

impl TransportRequest {
    /// Create a buffered request without body, query or headers.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            mode: ResponseMode::Buffered,
        }
    }

    /// Add a query parameter.
    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Add a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the JSON body.
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Ask for a live body instead of a buffered one.
    #[must_use]
    pub fn streaming(mut self) -> Self {
        self.mode = ResponseMode::Streaming;
        self
    }

    /// Last value of a header, compared case-insensitively.
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Response body, either already read or live.
#[derive(Debug)]
pub enum ResponseBody {
    /// The whole body.
    Buffered(Bytes),
    /// A live body owned by whoever holds the response.
    Streaming(ByteStream),
}

/// A response returned by a [`Transport`].
#[derive(Debug)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: ResponseBody,
}

impl TransportResponse {
    /// Whether the status is 400 or above.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }

    /// The `Content-Type` header, if present and valid text.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Take the body as a live stream. Buffered bodies are replayed as one chunk.
    pub fn into_stream(self) -> ByteStream {
        match self.body {
            ResponseBody::Streaming(stream) => stream,
            ResponseBody::Buffered(bytes) => ByteStream::from_chunks([bytes]),
        }
    }

    /// Read the whole body, closing a live stream afterwards.
    pub async fn bytes(self) -> Bytes {
        match self.body {
            ResponseBody::Buffered(bytes) => bytes,
            ResponseBody::Streaming(mut stream) => Bytes::from(stream.read_to_string().await),
        }
    }
}

/// Executes requests against the workflow service.
///
/// In [`ResponseMode::Streaming`] the implementation must return a live
/// [`ResponseBody::Streaming`] body. Cancelling `cancel` before a response
/// arrives must yield [`HttpError::Cancelled`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute a request.
    async fn execute(
        &self,
        request: TransportRequest,
        cancel: &CancellationToken,
    ) -> HttpResult<TransportResponse>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn execute(
        &self,
        request: TransportRequest,
        cancel: &CancellationToken,
    ) -> HttpResult<TransportResponse> {
        (**self).execute(request, cancel).await
    }
}

/// Build a header map where later entries replace earlier ones.
pub fn merge_headers<'a, I>(entries: I) -> HttpResult<HeaderMap>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut map = HeaderMap::new();
    for (name, value) in entries {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| HttpError::InvalidHeader {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| HttpError::InvalidHeader {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

/// HTTP transport backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: ClientConfig,
}

impl HttpTransport {
    /// Create a new transport with a default reqwest client.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Create with a custom reqwest client.
    pub fn with_client(client: Client, config: ClientConfig) -> Self {
        Self { client, config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn build(&self, request: &TransportRequest) -> HttpResult<reqwest::RequestBuilder> {
        let url = self.config.url_for(&request.path)?;

        let defaults = self
            .config
            .headers
            .iter()
            .map(|(n, v)| (n.as_str(), v.as_str()));
        let overrides = request.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()));
        let headers = merge_headers(defaults.chain(overrides))?;

        let mut builder = self
            .client
            .request(request.method.into(), url)
            .headers(headers);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        if request.mode == ResponseMode::Buffered {
            if let Some(timeout) = self.config.timeout_duration() {
                builder = builder.timeout(timeout);
            }
        }

        Ok(builder)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(
        &self,
        request: TransportRequest,
        cancel: &CancellationToken,
    ) -> HttpResult<TransportResponse> {
        if cancel.is_cancelled() {
            return Err(HttpError::Cancelled);
        }

        let builder = self.build(&request)?;
        debug!(method = %request.method, path = %request.path, mode = ?request.mode, "Sending request");

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(HttpError::Cancelled),
            result = builder.send() => result?,
        };

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        debug!(status, path = %request.path, "Received response");
        if status >= 400 {
            warn!(status, path = %request.path, "Service returned error status");
        }

        let body = match request.mode {
            ResponseMode::Streaming => {
                ResponseBody::Streaming(ByteStream::from_reqwest(response.bytes_stream()))
            }
            ResponseMode::Buffered => {
                let bytes = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(HttpError::Cancelled),
                    result = response.bytes() => result?,
                };
                ResponseBody::Buffered(bytes)
            }
        };

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport_for(server: &MockServer) -> HttpTransport {
        let config = ClientConfig::new(&server.uri())
            .unwrap()
            .header("x-api-key", "default")
            .header("x-tenant", "acme");
        HttpTransport::new(config)
    }

    #[test]
    fn test_merge_headers_later_wins() {
        let map = merge_headers([("Accept", "application/json"), ("accept", "text/event-stream")])
            .unwrap();
        assert_eq!(map.get("accept").unwrap(), "text/event-stream");
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_merge_headers_rejects_invalid() {
        let err = merge_headers([("bad header", "x")]).unwrap_err();
        assert!(matches!(err, HttpError::InvalidHeader { ref name, .. } if name == "bad header"));
    }

    #[test]
    fn test_request_builder() {
        let request = TransportRequest::new(Method::Get, "/store/items")
            .query("key", "k1")
            .header("X-Trace", "1")
            .header("x-trace", "2")
            .streaming();

        assert_eq!(request.query, vec![("key".to_string(), "k1".to_string())]);
        assert_eq!(request.header_value("X-TRACE"), Some("2"));
        assert_eq!(request.mode, ResponseMode::Streaming);
    }

    #[tokio::test]
    async fn test_buffered_request_sends_headers_query_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/runs/crons/search"))
            .and(query_param("debug", "true"))
            .and(header("x-api-key", "override"))
            .and(header("x-tenant", "acme"))
            .and(body_json(json!({"limit": 10})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let transport = transport_for(&server);
        let request = TransportRequest::new(Method::Post, "/runs/crons/search")
            .query("debug", "true")
            .header("x-api-key", "override")
            .json(json!({"limit": 10}));

        let response = transport
            .execute(request, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert!(matches!(response.body, ResponseBody::Buffered(ref b) if b.as_ref() == b"[]"));
    }

    #[tokio::test]
    async fn test_streaming_mode_returns_live_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/events"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw("{\"event\":\"a\"}\n", "text/event-stream"),
            )
            .mount(&server)
            .await;

        let transport = transport_for(&server);
        let response = transport
            .execute(
                TransportRequest::new(Method::Get, "/events").streaming(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(response.content_type(), Some("text/event-stream"));
        let mut stream = response.into_stream();
        let mut collected = Vec::new();
        while let Some(chunk) = stream.next().await {
            collected.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(collected, b"{\"event\":\"a\"}\n");
    }

    #[tokio::test]
    async fn test_error_status_is_returned_not_raised() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
            .mount(&server)
            .await;

        let transport = transport_for(&server);
        let response = transport
            .execute(
                TransportRequest::new(Method::Delete, "/runs/crons/c1"),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(response.is_error());
        assert_eq!(response.bytes().await.as_ref(), b"missing");
    }

    #[tokio::test]
    async fn test_cancelled_before_send() {
        let server = MockServer::start().await;
        let transport = transport_for(&server);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = transport
            .execute(TransportRequest::new(Method::Get, "/"), &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_while_waiting_for_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(10)))
            .mount(&server)
            .await;

        let transport = transport_for(&server);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            transport.execute(TransportRequest::new(Method::Get, "/slow"), &cancel),
        )
        .await
        .expect("cancellation should unblock the request")
        .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let transport = HttpTransport::new(ClientConfig::new("http://127.0.0.1:1").unwrap());
        let err = transport
            .execute(TransportRequest::new(Method::Get, "/"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::Transport(_)));
    }
}
