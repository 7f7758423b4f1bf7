use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which HTTP protocol the transport speaks to ClickHouse.
///
/// ClickHouse serves HTTP/1.1 on its default ports. HTTP/2 needs a proxy or
/// a server built with it, and then lets parallel batches share a connection.
///
/// # Example
///
/// ```rust
/// use clickhouse_link::HttpVersion;
///
/// let version: HttpVersion = "http/2".parse().unwrap();
/// assert_eq!(version, HttpVersion::Http2);
/// assert_eq!(version.to_string(), "http2");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HttpVersion {
    #[default]
    #[serde(rename = "http1", alias = "http/1.1", alias = "1.1")]
    Http1,

    /// Sent with prior knowledge, no upgrade negotiation.
    #[serde(rename = "http2", alias = "http/2", alias = "2")]
    Http2,

    /// ALPN negotiation over TLS, HTTP/1.1 over plain TCP.
    #[serde(rename = "auto")]
    Auto,
}

impl HttpVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVersion::Http1 => "http1",
            HttpVersion::Http2 => "http2",
            HttpVersion::Auto => "auto",
        }
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "http1" | "http/1.1" | "1.1" => Ok(HttpVersion::Http1),
            "http2" | "http/2" | "2" => Ok(HttpVersion::Http2),
            "auto" => Ok(HttpVersion::Auto),
            other => Err(format!(
                "Unsupported HTTP version: {}. Supported: http1, http2, auto",
                other
            )),
        }
    }
}
