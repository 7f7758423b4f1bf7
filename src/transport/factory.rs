//! Transport selection.

use super::http::{FanOut, HttpTransport};
use super::Transport;
use crate::auth::AuthProvider;
use crate::error::{LinkError, Result};
use crate::models::ConnectionOptions;
use crate::timeouts::LinkTimeouts;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Which transport implementation carries requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    /// Batch requests are multiplexed from the calling task.
    #[default]
    #[serde(alias = "guzzle", alias = "reqwest")]
    Http,

    /// Batch requests each run in their own tokio task.
    #[serde(alias = "spawned", alias = "curl")]
    HttpSpawned,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Http => "http",
            TransportKind::HttpSpawned => "http-spawned",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" | "guzzle" | "reqwest" => Ok(TransportKind::Http),
            "http-spawned" | "spawned" | "curl" => Ok(TransportKind::HttpSpawned),
            other => Err(LinkError::ConfigurationError(format!(
                "Unknown transport '{}'. Expected one of: http, http-spawned",
                other
            ))),
        }
    }
}

/// Connection parameters shared by every HTTP transport.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub auth: AuthProvider,
    pub timeouts: LinkTimeouts,
    pub connection_options: ConnectionOptions,
    /// Maximum number of batch requests in flight at once.
    pub concurrency: usize,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8123,
            database: "default".to_string(),
            auth: AuthProvider::default(),
            timeouts: LinkTimeouts::default(),
            connection_options: ConnectionOptions::default(),
            concurrency: 10,
        }
    }
}

impl HttpSettings {
    /// `scheme://host:port/`
    pub fn base_url(&self) -> String {
        format!(
            "{}://{}:{}/",
            self.connection_options.scheme(),
            self.host.trim_end_matches('/'),
            self.port
        )
    }
}

/// Build the transport named by `kind`.
pub fn make_transport(kind: TransportKind, settings: &HttpSettings) -> Result<Arc<dyn Transport>> {
    let transport = match kind {
        TransportKind::Http => HttpTransport::with_fan_out(settings, FanOut::Multiplexed)?,
        TransportKind::HttpSpawned => HttpTransport::with_fan_out(settings, FanOut::Spawned)?,
    };
    Ok(Arc::new(transport))
}
