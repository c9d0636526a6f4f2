//! Client configuration.

use crate::error::{HttpError, HttpResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Environment variable holding the service base URL.
pub const ENV_API_URL: &str = "WORKFLOW_API_URL";

/// Environment variable holding the buffered-request timeout in seconds.
pub const ENV_API_TIMEOUT: &str = "WORKFLOW_API_TIMEOUT_SECS";

/// Base URL of a locally running service.
pub const LOCAL_BASE_URL: &str = "http://localhost:8123";

/// How lines of an event-stream body are turned into events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framing {
    /// Every non-blank line is a JSON object carrying `event`, `data` and
    /// `metadata`; each such line is one event.
    #[default]
    JsonLines,
    /// Conventional `field: value` lines accumulated until a blank line.
    EventStream,
}

/// Configuration for a workflow service client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the service.
    pub base_url: Url,
    /// Headers sent with every request.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Timeout for buffered requests, in milliseconds. Streams are bounded
    /// only by their cancellation token.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Capacity of the event channel of a stream session.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
    /// Framing used for event-stream bodies.
    #[serde(default)]
    pub framing: Framing,
}

fn default_event_buffer() -> usize {
    1
}

impl ClientConfig {
    /// Create a config for the given base URL.
    pub fn new(base_url: &str) -> HttpResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| HttpError::InvalidConfig(format!("invalid base URL '{base_url}': {e}")))?;
        Ok(Self {
            base_url,
            headers: HashMap::new(),
            timeout_ms: None,
            event_buffer: default_event_buffer(),
            framing: Framing::default(),
        })
    }

    /// Load the config from `WORKFLOW_API_URL` and `WORKFLOW_API_TIMEOUT_SECS`.
    pub fn from_env() -> HttpResult<Self> {
        let url = std::env::var(ENV_API_URL)
            .map_err(|_| HttpError::InvalidConfig(format!("{ENV_API_URL} not set")))?;
        let mut config = Self::new(&url)?;

        if let Ok(raw) = std::env::var(ENV_API_TIMEOUT) {
            let secs = raw.trim().parse::<u64>().map_err(|_| {
                HttpError::InvalidConfig(format!("{ENV_API_TIMEOUT} must be an integer, got '{raw}'"))
            })?;
            config.timeout_ms = Some(secs.saturating_mul(1000));
        }

        Ok(config)
    }

    /// Add a header sent with every request.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the buffered-request timeout. Sub-millisecond parts round up.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        let millis = timeout.as_nanos().div_ceil(1_000_000);
        self.timeout_ms = Some(u64::try_from(millis).unwrap_or(u64::MAX));
        self
    }

    /// Set the event channel capacity. Values below 1 are raised to 1.
    #[must_use]
    pub fn event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity.max(1);
        self
    }

    /// Set the event-stream framing.
    #[must_use]
    pub fn framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    /// Timeout as a duration, if set.
    #[must_use]
    pub fn timeout_duration(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Resolve a request path against the base URL.
    ///
    /// The path is appended to the base URL's path, so a base of
    /// `http://host/api` and a path of `/runs/crons` give `http://host/api/runs/crons`.
    pub fn url_for(&self, path: &str) -> HttpResult<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        let joined = if path.is_empty() {
            format!("{base}/")
        } else {
            format!("{base}/{path}")
        };
        Url::parse(&joined)
            .map_err(|e| HttpError::InvalidConfig(format!("invalid request URL '{joined}': {e}")))
    }
}
