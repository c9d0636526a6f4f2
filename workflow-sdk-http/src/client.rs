//! Request/response JSON exchange with the workflow service.

use crate::error::{HttpError, HttpResult};
use crate::method::Method;
use crate::transport::{ResponseObserver, Transport, TransportRequest};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Per-call options: extra headers and the cancellation token.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Headers added to this call, overriding client defaults.
    pub headers: Vec<(String, String)>,
    /// Cancels the call when triggered.
    pub cancel: CancellationToken,
}

impl CallOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
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
}

/// Synchronous JSON exchange over a [`Transport`].
///
/// Every call sends `Accept: application/json`, adds
/// `Content-Type: application/json` when a body is present, turns a status
/// of 400 or above into [`HttpError::Status`] and deserializes the reply
/// straight into the requested type. An empty reply body deserializes as
/// JSON `null`, so `()` and `Option<T>` accept it.
#[derive(Clone)]
pub struct HttpClient {
    transport: Arc<dyn Transport>,
    observer: Option<ResponseObserver>,
}

impl HttpClient {
    /// Create a client over the given transport.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            observer: None,
        }
    }

    /// Call `observer` with the status and headers of every response.
    #[must_use]
    pub fn with_observer(mut self, observer: ResponseObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// The underlying transport.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Check that the service is reachable with `GET /`.
    ///
    /// Any response, including an error status, counts as reachable.
    pub async fn check_connection(&self) -> HttpResult<()> {
        let request = TransportRequest::new(Method::Get, "/");
        self.transport
            .execute(request, &CancellationToken::new())
            .await
            .map(|_| ())
    }

    /// Send a GET request.
    pub async fn get<R: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        options: &CallOptions,
    ) -> HttpResult<R> {
        let mut request = TransportRequest::new(Method::Get, path);
        for (name, value) in query {
            request = request.query(*name, *value);
        }
        let bytes = self.send(request, options).await?;
        decode(&bytes)
    }

    /// Send a POST request.
    pub async fn post<R: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<Value>,
        options: &CallOptions,
    ) -> HttpResult<R> {
        let bytes = self.send(with_body(Method::Post, path, body), options).await?;
        decode(&bytes)
    }

    /// Send a PUT request.
    pub async fn put<R: DeserializeOwned>(
        &self,
        path: &str,
        body: Value,
        options: &CallOptions,
    ) -> HttpResult<R> {
        let bytes = self
            .send(with_body(Method::Put, path, Some(body)), options)
            .await?;
        decode(&bytes)
    }

    /// Send a PATCH request.
    pub async fn patch<R: DeserializeOwned>(
        &self,
        path: &str,
        body: Value,
        options: &CallOptions,
    ) -> HttpResult<R> {
        let bytes = self
            .send(with_body(Method::Patch, path, Some(body)), options)
            .await?;
        decode(&bytes)
    }

    /// Send a DELETE request. The reply body is ignored.
    pub async fn delete(
        &self,
        path: &str,
        body: Option<Value>,
        options: &CallOptions,
    ) -> HttpResult<()> {
        self.send(with_body(Method::Delete, path, body), options)
            .await
            .map(|_| ())
    }

    /// Execute a buffered request and return the raw reply body.
    pub async fn send(&self, request: TransportRequest, options: &CallOptions) -> HttpResult<Bytes> {
        let mut request = request.header("Accept", "application/json");
        for (name, value) in &options.headers {
            request = request.header(name.clone(), value.clone());
        }

        let method = request.method;
        let path = request.path.clone();
        let response = self.transport.execute(request, &options.cancel).await?;

        if let Some(observer) = &self.observer {
            observer(response.status, &response.headers);
        }

        let status = response.status;
        let is_error = response.is_error();
        let body = response.bytes().await;
        debug!(%method, %path, status, bytes = body.len(), "Request completed");

        if is_error {
            return Err(HttpError::status(
                status,
                String::from_utf8_lossy(&body).into_owned(),
            ));
        }

        Ok(body)
    }
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("observer", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}

fn with_body(method: Method, path: &str, body: Option<Value>) -> TransportRequest {
    let request = TransportRequest::new(method, path);
    match body {
        Some(body) => request
            .header("Content-Type", "application/json")
            .json(body),
        None => request,
    }
}

fn decode<R: DeserializeOwned>(bytes: &[u8]) -> HttpResult<R> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::from_str("null")?);
    }
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTransport;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicU16, Ordering};
    use tokio_test::{assert_err, assert_ok};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Thread {
        thread_id: String,
    }

    fn client() -> (Arc<MemoryTransport>, HttpClient) {
        let transport = Arc::new(MemoryTransport::new());
        let client = HttpClient::new(transport.clone());
        (transport, client)
    }

    #[tokio::test]
    async fn test_get_decodes_typed_result() {
        let (transport, client) = client();
        transport.respond_json(200, &json!({"thread_id": "t-1"}));

        let thread: Thread = client
            .get("/threads/t-1", &[("select", "id")], &CallOptions::new())
            .await
            .unwrap();

        assert_eq!(thread, Thread { thread_id: "t-1".into() });
        let request = transport.last_request().unwrap();
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.query, vec![("select".to_string(), "id".to_string())]);
        assert_eq!(request.header_value("accept"), Some("application/json"));
        assert_eq!(request.header_value("content-type"), None);
    }

    #[tokio::test]
    async fn test_post_sets_content_type_and_body() {
        let (transport, client) = client();
        transport.respond_json(200, &json!([]));

        let options = CallOptions::new().header("x-request-id", "r-1");
        let result: Vec<Value> = client
            .post("/runs/crons/search", Some(json!({"limit": 10})), &options)
            .await
            .unwrap();

        assert!(result.is_empty());
        let request = transport.last_request().unwrap();
        assert_eq!(request.body, Some(json!({"limit": 10})));
        assert_eq!(request.header_value("Content-Type"), Some("application/json"));
        assert_eq!(request.header_value("x-request-id"), Some("r-1"));
    }

    #[tokio::test]
    async fn test_error_status_carries_body() {
        let (transport, client) = client();
        transport.respond_text(422, "invalid schedule");

        let err = client
            .put::<Value>("/store/items", json!({}), &CallOptions::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            HttpError::Status { status: 422, ref body } if body == "invalid schedule"
        ));
    }

    #[tokio::test]
    async fn test_empty_body_decodes_as_null() {
        let (transport, client) = client();
        transport.respond_text(204, "");
        transport.respond_text(200, "  ");

        client
            .patch::<()>("/threads/t-1", json!({"metadata": {}}), &CallOptions::new())
            .await
            .unwrap();

        let missing: Option<Thread> = client
            .get("/threads/t-2", &[], &CallOptions::new())
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_delete_ignores_reply() {
        let (transport, client) = client();
        transport.respond_text(200, "not json at all");

        client
            .delete("/runs/crons/c-1", None, &CallOptions::new())
            .await
            .unwrap();
        assert_eq!(transport.last_request().unwrap().method, Method::Delete);
    }

    #[tokio::test]
    async fn test_invalid_json_is_json_error() {
        let (transport, client) = client();
        transport.respond_text(200, "{not json");

        let err = client
            .get::<Value>("/info", &[], &CallOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::Json(_)));
    }

    #[tokio::test]
    async fn test_observer_sees_every_status() {
        let (transport, client) = client();
        let seen = Arc::new(AtomicU16::new(0));
        let seen_clone = Arc::clone(&seen);
        let client = client.with_observer(Arc::new(move |status, _headers| {
            seen_clone.store(status, Ordering::SeqCst);
        }));
        transport.respond_text(503, "busy");

        let _ = client.get::<Value>("/ok", &[], &CallOptions::new()).await;
        assert_eq!(seen.load(Ordering::SeqCst), 503);
    }

    #[tokio::test]
    async fn test_cancelled_call() {
        let (_transport, client) = client();
        let token = CancellationToken::new();
        token.cancel();

        let err = client
            .get::<Value>("/", &[], &CallOptions::new().cancel_with(token))
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_check_connection_accepts_error_status() {
        let (transport, client) = client();
        transport.respond_text(404, "");
        assert_ok!(client.check_connection().await);

        transport.push_error(HttpError::transport("connection refused"));
        assert_err!(client.check_connection().await);
    }
}
