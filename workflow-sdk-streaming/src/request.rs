//! Stream request descriptors.

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use workflow_sdk_http::{Method, TransportRequest, EVENT_STREAM};

/// Everything needed to open one event stream.
///
/// A request is consumed by [`StreamSession::open`](crate::StreamSession::open);
/// its token stays with the background task for the life of the stream.
#[derive(Debug)]
pub struct StreamRequest {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the service base URL.
    pub path: String,
    /// Optional JSON body.
    pub body: Option<Value>,
    /// Query parameters, in order.
    pub query: Vec<(String, String)>,
    /// Extra headers, overriding client defaults.
    pub headers: Vec<(String, String)>,
    /// Cancels the request and the stream.
    pub cancel: CancellationToken,
}

impl StreamRequest {
    /// Create a request without body, query or extra headers.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            query: Vec::new(),
            headers: Vec::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Shorthand for a POST with a JSON body.
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, path).json(body)
    }

    /// Set the JSON body.
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
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

    /// Use the given cancellation token.
    #[must_use]
    pub fn cancel_with(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Split into the transport request and the token.
    ///
    /// Caller headers come first; the event-stream protocol headers are
    /// appended last so they always win.
    pub(crate) fn into_transport(self) -> (TransportRequest, CancellationToken) {
        let mut request = TransportRequest::new(self.method, self.path).streaming();
        request.query = self.query;
        request.headers = self.headers;

        request = request
            .header("Accept", EVENT_STREAM)
            .header("Cache-Control", "no-store");

        if let Some(body) = self.body {
            request = request
                .header("Content-Type", "application/json")
                .json(body);
        }

        (request, self.cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use workflow_sdk_http::ResponseMode;

    #[test]
    fn test_protocol_headers_win() {
        let (request, _) = StreamRequest::new(Method::Get, "/threads/t-1/runs/r-1/stream")
            .header("accept", "application/json")
            .header("x-api-key", "secret")
            .into_transport();

        assert_eq!(request.mode, ResponseMode::Streaming);
        assert_eq!(request.header_value("Accept"), Some("text/event-stream"));
        assert_eq!(request.header_value("Cache-Control"), Some("no-store"));
        assert_eq!(request.header_value("x-api-key"), Some("secret"));
        assert_eq!(request.header_value("Content-Type"), None);
    }

    #[test]
    fn test_body_adds_content_type() {
        let (request, _) = StreamRequest::post("/runs/stream", json!({"input": {}}))
            .query("debug", "1")
            .into_transport();

        assert_eq!(request.method, Method::Post);
        assert_eq!(request.body, Some(json!({"input": {}})));
        assert_eq!(request.header_value("content-type"), Some("application/json"));
        assert_eq!(request.query, vec![("debug".to_string(), "1".to_string())]);
    }

    #[test]
    fn test_token_is_kept() {
        let token = CancellationToken::new();
        let (_, cancel) = StreamRequest::new(Method::Get, "/")
            .cancel_with(token.clone())
            .into_transport();

        token.cancel();
        assert!(cancel.is_cancelled());
    }
}
