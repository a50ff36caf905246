//! Client configuration.

use std::time::Duration;

/// Configuration for an [`NgsiClient`](crate::NgsiClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Broker root URL, without the `/v2` suffix.
    pub base_url: String,
    /// HTTP request timeout
    pub request_timeout: Duration,
    /// TCP connect timeout
    pub connect_timeout: Duration,
}

impl ClientConfig {
    /// Create a configuration for the given broker with default timeouts.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Set the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Root of the v2 API, e.g. `http://localhost:1026/v2`.
    pub fn api_root(&self) -> String {
        format!("{}/v2", self.base_url.trim_end_matches('/'))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:1026".to_string(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}
