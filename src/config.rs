//! Client configuration from TOML files and `CLICKHOUSE_*` environment variables.
//!
//! # Configuration Format
//!
//! ```toml
//! [clickhouse]
//! host = "localhost"          # Server host
//! port = 8123                 # HTTP interface port
//! database = "default"
//! username = "default"
//! password = ""
//! transport = "http"          # http, http-spawned
//! https = false
//! concurrency = 10            # Max parallel requests in flight
//! timeout_secs = 30           # Whole-request timeout (0 = none)
//! connect_timeout_secs = 10
//! http_version = "http1"      # http1, http2, auto
//!
//! [clickhouse.headers]
//! X-Request-Source = "reporting"
//! ```
//!
//! The `[clickhouse]` table is optional; the same keys are accepted at the
//! top level of the document.

use crate::client::ClickHouseClient;
use crate::error::{LinkError, Result};
use crate::models::{ConnectionOptions, HttpVersion};
use crate::timeouts::LinkTimeouts;
use crate::transport::TransportKind;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

/// Prefix of the environment variables read by [`ClickHouseConfig::from_env`].
pub const ENV_PREFIX: &str = "CLICKHOUSE_";

/// Connection settings for a [`ClickHouseClient`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickHouseConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Transport implementation: "http" or "http-spawned"
    #[serde(default)]
    pub transport: TransportKind,

    #[serde(default)]
    pub https: bool,

    /// Maximum parallel requests in flight (default: 10)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Whole-request timeout in seconds, 0 disables (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connection timeout in seconds (default: 10)
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Extra headers sent with every request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default)]
    pub http_version: HttpVersion,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8123
}

fn default_database() -> String {
    "default".to_string()
}

fn default_username() -> String {
    "default".to_string()
}

fn default_concurrency() -> usize {
    10
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database: default_database(),
            username: default_username(),
            password: String::new(),
            transport: TransportKind::default(),
            https: false,
            concurrency: default_concurrency(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            headers: BTreeMap::new(),
            http_version: HttpVersion::default(),
        }
    }
}

impl ClickHouseConfig {
    /// Parse a TOML document, reading the `[clickhouse]` table when present.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let mut document: toml::Table = contents.parse()?;
        let table = match document.remove("clickhouse") {
            Some(toml::Value::Table(table)) => table,
            Some(_) => {
                return Err(LinkError::ConfigurationError(
                    "[clickhouse] must be a table".into(),
                ))
            },
            None => document,
        };
        Ok(toml::Value::Table(table).try_into()?)
    }

    /// Load configuration from file
    ///
    /// Returns default configuration if file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("[CH_CONFIG] {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            LinkError::ConfigurationError(format!("Failed to read config file: {}", e))
        })?;

        Self::from_toml_str(&contents)
    }

    /// Defaults overridden by `CLICKHOUSE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::default().apply_overrides(|key| std::env::var(key).ok())
    }

    /// Override fields from `CLICKHOUSE_*` variables resolved by `lookup`.
    ///
    /// Recognised: `HOST`, `PORT`, `DATABASE`, `USERNAME` (or `USER`),
    /// `PASSWORD`, `TRANSPORT`, `HTTPS`, `CONCURRENCY`, `TIMEOUT_SECS`,
    /// `CONNECT_TIMEOUT_SECS`, `HTTP_VERSION`.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(host) = var("HOST") {
            self.host = host;
        }
        if let Some(port) = var("PORT") {
            self.port = parse_var("PORT", &port)?;
        }
        if let Some(database) = var("DATABASE") {
            self.database = database;
        }
        if let Some(username) = var("USERNAME").or_else(|| var("USER")) {
            self.username = username;
        }
        if let Some(password) = var("PASSWORD") {
            self.password = password;
        }
        if let Some(transport) = var("TRANSPORT") {
            self.transport = transport.parse()?;
        }
        if let Some(https) = var("HTTPS") {
            self.https = parse_flag("HTTPS", &https)?;
        }
        if let Some(concurrency) = var("CONCURRENCY") {
            self.concurrency = parse_var("CONCURRENCY", &concurrency)?;
        }
        if let Some(timeout) = var("TIMEOUT_SECS") {
            self.timeout_secs = parse_var("TIMEOUT_SECS", &timeout)?;
        }
        if let Some(timeout) = var("CONNECT_TIMEOUT_SECS") {
            self.connect_timeout_secs = parse_var("CONNECT_TIMEOUT_SECS", &timeout)?;
        }
        if let Some(version) = var("HTTP_VERSION") {
            self.http_version = version.parse().map_err(LinkError::ConfigurationError)?;
        }

        Ok(self)
    }

    pub fn timeouts(&self) -> LinkTimeouts {
        LinkTimeouts::builder()
            .connection_timeout_secs(self.connect_timeout_secs)
            .request_timeout_secs(self.timeout_secs)
            .build()
    }

    pub fn to_connection_options(&self) -> ConnectionOptions {
        let mut options = ConnectionOptions::default()
            .with_http_version(self.http_version)
            .with_https(self.https);
        options.headers = self.headers.clone();
        options
    }

    /// Build a client from this configuration.
    pub fn into_client(self) -> Result<ClickHouseClient> {
        ClickHouseClient::builder()
            .timeouts(self.timeouts())
            .connection_options(self.to_connection_options())
            .host(self.host)
            .port(self.port)
            .database(self.database)
            .credentials(self.username, self.password)
            .transport_kind(self.transport)
            .concurrency(self.concurrency)
            .build()
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| {
        LinkError::ConfigurationError(format!("Invalid {}{} '{}': {}", ENV_PREFIX, name, value, e))
    })
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(LinkError::ConfigurationError(format!(
            "Invalid {}{} '{}': expected true or false",
            ENV_PREFIX, name, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use std::time::Duration;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClickHouseConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 8123);
        assert_eq!(config.database, "default");
        assert_eq!(config.username, "default");
        assert_eq!(config.password, "");
        assert_eq!(config.transport, TransportKind::Http);
        assert!(!config.https);
        assert_eq!(config.concurrency, 10);
        assert_eq!(config.timeouts(), LinkTimeouts::default());
    }

    #[test]
    fn test_parse_clickhouse_table() {
        let config = ClickHouseConfig::from_toml_str(
            r#"
            [clickhouse]
            host = "ch.internal"
            port = 9000
            transport = "curl"
            https = true
            timeout_secs = 0
            http_version = "http2"

            [clickhouse.headers]
            X-Request-Source = "reporting"
            "#,
        )
        .unwrap();

        assert_eq!(config.host, "ch.internal");
        assert_eq!(config.port, 9000);
        assert_eq!(config.database, "default");
        assert_eq!(config.transport, TransportKind::HttpSpawned);
        assert_eq!(config.http_version, HttpVersion::Http2);
        assert_eq!(config.timeouts().request_timeout, Duration::ZERO);

        let options = config.to_connection_options();
        assert_eq!(options.scheme(), "https");
        assert_eq!(options.headers.get("X-Request-Source").map(String::as_str), Some("reporting"));
    }

    #[test]
    fn test_parse_top_level_keys() {
        let config = ClickHouseConfig::from_toml_str("database = \"analytics\"\nconcurrency = 3").unwrap();
        assert_eq!(config.database, "analytics");
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.host, "localhost");
    }

    #[test]
    fn test_parse_errors() {
        let err = ClickHouseConfig::from_toml_str("transport = \"pigeon\"").unwrap_err();
        assert!(matches!(err, LinkError::ConfigurationError(_)));

        let err = ClickHouseConfig::from_toml_str("clickhouse = 1").unwrap_err();
        assert!(matches!(err, LinkError::ConfigurationError(_)));

        assert!(ClickHouseConfig::from_toml_str("port = \"eighty\"").is_err());
        assert!(ClickHouseConfig::from_toml_str("[clickhouse").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[clickhouse]\nhost = \"db1\"\npassword = \"s3cret\"").unwrap();

        let config = ClickHouseConfig::load(file.path()).unwrap();
        assert_eq!(config.host, "db1");
        assert_eq!(config.password, "s3cret");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClickHouseConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, ClickHouseConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let config = ClickHouseConfig::default()
            .apply_overrides(env(&[
                ("CLICKHOUSE_HOST", "10.0.0.5"),
                ("CLICKHOUSE_PORT", "18123"),
                ("CLICKHOUSE_USER", "reader"),
                ("CLICKHOUSE_TRANSPORT", "spawned"),
                ("CLICKHOUSE_HTTPS", "yes"),
                ("CLICKHOUSE_CONCURRENCY", "2"),
                ("CLICKHOUSE_HTTP_VERSION", "auto"),
            ]))
            .unwrap();

        assert_eq!(config.host, "10.0.0.5");
        assert_eq!(config.port, 18123);
        assert_eq!(config.username, "reader");
        assert_eq!(config.transport, TransportKind::HttpSpawned);
        assert!(config.https);
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.http_version, HttpVersion::Auto);
        assert_eq!(config.database, "default");
    }

    #[test]
    fn test_env_username_wins_over_user() {
        let config = ClickHouseConfig::default()
            .apply_overrides(env(&[
                ("CLICKHOUSE_USERNAME", "primary"),
                ("CLICKHOUSE_USER", "fallback"),
            ]))
            .unwrap();
        assert_eq!(config.username, "primary");
    }

    #[test]
    fn test_env_invalid_values() {
        for (key, value) in [
            ("CLICKHOUSE_PORT", "not-a-port"),
            ("CLICKHOUSE_HTTPS", "maybe"),
            ("CLICKHOUSE_HTTP_VERSION", "http3"),
            ("CLICKHOUSE_TRANSPORT", "udp"),
        ] {
            let err = ClickHouseConfig::default()
                .apply_overrides(env(&[(key, value)]))
                .unwrap_err();
            assert!(matches!(err, LinkError::ConfigurationError(_)), "{}", key);
        }
    }

    #[test]
    fn test_into_client() {
        assert!(ClickHouseConfig::default().into_client().is_ok());

        let config = ClickHouseConfig {
            concurrency: 0,
            ..ClickHouseConfig::default()
        };
        assert!(config.into_client().is_err());
    }
}
