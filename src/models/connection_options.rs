use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::http_version::HttpVersion;

/// Connection-level options for the HTTP client.
///
/// These options are passed through to the underlying HTTP client:
/// - HTTP protocol version (HTTP/1.1 or HTTP/2)
/// - TLS on/off
/// - Connection pool sizing
/// - Extra headers sent with every request
///
/// Separate from [`LinkTimeouts`](crate::LinkTimeouts) which controls how long
/// requests may take.
///
/// # Example
///
/// ```rust
/// use clickhouse_link::{ConnectionOptions, HttpVersion};
///
/// let options = ConnectionOptions::default()
///     .with_http_version(HttpVersion::Http2)
///     .with_https(true)
///     .with_header("X-Request-Source", "reporting");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionOptions {
    /// HTTP protocol version to use for connections
    /// Default: Http1 (HTTP/1.1) for maximum compatibility
    #[serde(default)]
    pub http_version: HttpVersion,

    /// Use `https://` instead of `http://`
    /// Default: false
    #[serde(default)]
    pub https: bool,

    /// Maximum idle keep-alive connections kept per host
    /// Default: 10 (matches the default parallel concurrency)
    #[serde(default = "default_pool_max_idle_per_host")]
    pub pool_max_idle_per_host: usize,

    /// How long idle connections stay in the pool, in seconds
    /// Default: 90
    #[serde(default = "default_pool_idle_timeout_secs")]
    pub pool_idle_timeout_secs: u64,

    /// Extra headers added to every request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_pool_max_idle_per_host() -> usize {
    10
}

fn default_pool_idle_timeout_secs() -> u64 {
    90
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            http_version: HttpVersion::default(),
            https: false,
            pool_max_idle_per_host: default_pool_max_idle_per_host(),
            pool_idle_timeout_secs: default_pool_idle_timeout_secs(),
            headers: BTreeMap::new(),
        }
    }
}

impl ConnectionOptions {
    /// Create new connection options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the HTTP protocol version to use
    pub fn with_http_version(mut self, version: HttpVersion) -> Self {
        self.http_version = version;
        self
    }

    /// Enable or disable TLS
    pub fn with_https(mut self, https: bool) -> Self {
        self.https = https;
        self
    }

    /// Set the maximum number of idle pooled connections per host
    pub fn with_pool_max_idle_per_host(mut self, max_idle: usize) -> Self {
        self.pool_max_idle_per_host = max_idle;
        self
    }

    /// Set the idle connection lifetime (in seconds)
    pub fn with_pool_idle_timeout_secs(mut self, secs: u64) -> Self {
        self.pool_idle_timeout_secs = secs;
        self
    }

    /// Add a header sent with every request
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// URL scheme implied by the TLS setting
    pub fn scheme(&self) -> &'static str {
        if self.https {
            "https"
        } else {
            "http"
        }
    }
}
