//! Error types for clickhouse-link

use crate::models::Response;
use std::fmt;
use thiserror::Error;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, LinkError>;

/// Errors that can occur while turning a value into SQL literal text.
///
/// These always point at caller input and are never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EscapeError {
    #[error("Strings with null bytes cannot be escaped. Use the binary escape option.")]
    NullByte,

    #[error("Strings with invalid UTF-8 byte sequences cannot be escaped.")]
    InvalidUtf8,

    #[error("Unsupported value type: {0}")]
    UnsupportedType(String),

    #[error("The database connection does not support escaping binary values.")]
    BinaryUnsupported,
}

/// A query the server rejected, or a request that never completed.
///
/// Carries the parsed [`Response`] when one could be obtained (for example a
/// 5xx reply whose body still parsed), the ClickHouse exception code when the
/// body matched the server's error text, and the underlying HTTP error.
#[derive(Debug)]
pub struct QueryError {
    message: String,
    code: Option<u32>,
    status: Option<u16>,
    response: Option<Box<Response>>,
    source: Option<reqwest::Error>,
}

impl QueryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            status: None,
            response: None,
            source: None,
        }
    }

    /// Attach the ClickHouse exception code (`Code: <n>`).
    pub fn with_code(mut self, code: u32) -> Self {
        self.code = Some(code);
        self
    }

    /// Attach the HTTP status of the reply.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Attach the response parsed from the failed reply.
    pub fn with_response(mut self, response: Response) -> Self {
        self.response = Some(Box::new(response));
        self
    }

    /// Attach the transport error that caused the failure.
    pub fn with_source(mut self, source: reqwest::Error) -> Self {
        self.source = Some(source);
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> Option<u32> {
        self.code
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// The response the server sent alongside the failure, if it was readable.
    pub fn response(&self) -> Option<&Response> {
        self.response.as_deref()
    }

    /// True when the request failed before any reply was received
    /// (connection refused, timeout, TLS failure).
    pub fn is_transport_failure(&self) -> bool {
        self.source
            .as_ref()
            .map(|e| e.is_connect() || e.is_timeout() || e.is_request())
            .unwrap_or(false)
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for QueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Crate-wide error type.
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Escape error: {0}")]
    Escape(#[from] EscapeError),

    #[error("{0}")]
    Query(#[from] QueryError),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl LinkError {
    /// The query error, if this is one.
    pub fn as_query_error(&self) -> Option<&QueryError> {
        match self {
            LinkError::Query(e) => Some(e),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for LinkError {
    fn from(err: toml::de::Error) -> Self {
        LinkError::ConfigurationError(format!("TOML parse error: {}", err))
    }
}

impl From<std::io::Error> for LinkError {
    fn from(err: std::io::Error) -> Self {
        LinkError::ConfigurationError(err.to_string())
    }
}

impl From<serde_json::Error> for LinkError {
    fn from(err: serde_json::Error) -> Self {
        LinkError::SerializationError(err.to_string())
    }
}
