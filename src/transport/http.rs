//! ClickHouse HTTP transport.
//!
//! Every statement is one `POST` to the server root with the SQL as body:
//!
//! ```text
//! POST /?database=<db>&readonly=<0|2>&default_format=JSON
//! X-ClickHouse-User: <user>
//! X-ClickHouse-Key: <password>
//! ```

use super::classify::is_select_query;
use super::factory::HttpSettings;
use super::parse::{parse_reply, RawReply, SUMMARY_HEADER};
use super::Transport;
use crate::auth::AuthProvider;
use crate::error::{LinkError, QueryError, Result};
use crate::models::{BatchKey, HttpVersion, Response};
use crate::parallel::{collect_outcome, BatchOutcome};
use crate::timeouts::LinkTimeouts;
use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// Read-only level sent with reads: reads and settings changes allowed.
const READONLY_READ: &str = "2";

/// Read-only level sent with writes: no restriction.
const READONLY_WRITE: &str = "0";

/// How a batch is spread over concurrent requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanOut {
    /// All requests are polled from the calling task through a buffered stream.
    Multiplexed,
    /// Each request runs in its own tokio task, gated by a semaphore.
    Spawned,
}

/// Everything needed to send one request; cheap to clone into tasks.
#[derive(Clone)]
struct Endpoint {
    url: String,
    database: String,
    http_client: reqwest::Client,
    auth: AuthProvider,
}

impl Endpoint {
    fn build_request(&self, sql: &str, is_select: bool) -> reqwest::RequestBuilder {
        let readonly = if is_select { READONLY_READ } else { READONLY_WRITE };
        let request = self
            .http_client
            .post(&self.url)
            .query(&[
                ("database", self.database.as_str()),
                ("readonly", readonly),
                ("default_format", "JSON"),
            ])
            .body(sql.to_string());

        self.auth.apply_to_request(request)
    }

    async fn send(&self, sql: &str, is_select: bool) -> std::result::Result<Response, QueryError> {
        let started = Instant::now();
        let reply = self
            .build_request(sql, is_select)
            .send()
            .await
            .map_err(transport_error)?;

        let raw = read_reply(reply).await?;
        debug!(
            "[CH_HTTP] Response received: status={} duration_ms={}",
            raw.status,
            started.elapsed().as_millis()
        );

        parse_reply(sql, is_select, &raw)
    }
}

async fn read_reply(reply: reqwest::Response) -> std::result::Result<RawReply, QueryError> {
    let status = reply.status().as_u16();
    let content_type = header_str(reply.headers(), CONTENT_TYPE.as_str()).unwrap_or_default();
    let summary = header_str(reply.headers(), SUMMARY_HEADER);

    let body = reply.text().await.map_err(|e| {
        QueryError::new(format!("ClickHouse connection failed: {}", e))
            .with_status(status)
            .with_source(e)
    })?;

    Ok(RawReply {
        status,
        content_type,
        summary,
        body,
    })
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn transport_error(err: reqwest::Error) -> QueryError {
    let message = if err.is_timeout() {
        format!("ClickHouse request timed out: {}", err)
    } else {
        format!("ClickHouse connection failed: {}", err)
    };
    QueryError::new(message).with_source(err)
}

fn sql_preview(sql: &str) -> String {
    let flat = sql.replace('\n', " ");
    if flat.chars().count() > 80 {
        format!("{}...", flat.chars().take(80).collect::<String>())
    } else {
        flat
    }
}

fn build_default_headers(headers: &std::collections::BTreeMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            LinkError::ConfigurationError(format!("Invalid header name '{}': {}", name, e))
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            LinkError::ConfigurationError(format!("Invalid value for header '{}': {}", name, e))
        })?;
        map.insert(name, value);
    }
    Ok(map)
}

/// Transport speaking the ClickHouse HTTP interface through `reqwest`.
///
/// The underlying `reqwest::Client` pools connections and is shared by every
/// request this transport sends.
#[derive(Clone)]
pub struct HttpTransport {
    endpoint: Endpoint,
    concurrency: usize,
    fan_out: FanOut,
}

impl HttpTransport {
    /// Transport that multiplexes batch requests from the calling task.
    pub fn new(settings: &HttpSettings) -> Result<Self> {
        Self::with_fan_out(settings, FanOut::Multiplexed)
    }

    /// Transport that runs each batch request in its own task.
    pub fn spawned(settings: &HttpSettings) -> Result<Self> {
        Self::with_fan_out(settings, FanOut::Spawned)
    }

    pub fn with_fan_out(settings: &HttpSettings, fan_out: FanOut) -> Result<Self> {
        if settings.host.trim().is_empty() {
            return Err(LinkError::ConfigurationError("host is required".into()));
        }
        if settings.concurrency == 0 {
            return Err(LinkError::ConfigurationError(
                "concurrency must be at least 1".into(),
            ));
        }

        let options = &settings.connection_options;
        let mut client_builder = reqwest::Client::builder()
            .pool_max_idle_per_host(options.pool_max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(options.pool_idle_timeout_secs))
            .default_headers(build_default_headers(&options.headers)?);

        if !LinkTimeouts::is_no_timeout(settings.timeouts.connection_timeout) {
            client_builder = client_builder.connect_timeout(settings.timeouts.connection_timeout);
        }
        if !LinkTimeouts::is_no_timeout(settings.timeouts.request_timeout) {
            client_builder = client_builder.timeout(settings.timeouts.request_timeout);
        }

        client_builder = match options.http_version {
            HttpVersion::Http1 => {
                debug!("[CH_CLIENT] Using HTTP/1.1 only");
                client_builder.http1_only()
            },
            HttpVersion::Http2 => {
                debug!("[CH_CLIENT] Using HTTP/2 with prior knowledge");
                client_builder.http2_prior_knowledge()
            },
            HttpVersion::Auto => {
                debug!("[CH_CLIENT] Using automatic HTTP version negotiation");
                client_builder
            },
        };

        let http_client = client_builder
            .build()
            .map_err(|e| LinkError::ConfigurationError(e.to_string()))?;

        Ok(Self {
            endpoint: Endpoint {
                url: settings.base_url(),
                database: settings.database.clone(),
                http_client,
                auth: settings.auth.clone(),
            },
            concurrency: settings.concurrency,
            fan_out,
        })
    }

    /// Server root URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.endpoint.url
    }

    pub fn database(&self) -> &str {
        &self.endpoint.database
    }

    /// Maximum number of batch requests in flight at once.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn fan_out(&self) -> FanOut {
        self.fan_out
    }

    /// Build the request a statement would be sent as, without sending it.
    pub fn build_request(&self, sql: &str, is_select: bool) -> Result<reqwest::Request> {
        self.endpoint
            .build_request(sql, is_select)
            .build()
            .map_err(|e| LinkError::ConfigurationError(e.to_string()))
    }

    async fn run_multiplexed(
        &self,
        sqls: Vec<(BatchKey, String)>,
    ) -> Vec<(BatchKey, std::result::Result<Response, QueryError>)> {
        let endpoint = &self.endpoint;
        stream::iter(sqls)
            .map(|(key, sql)| async move {
                let result = endpoint.send(&sql, true).await;
                (key, result)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await
    }

    async fn run_spawned(
        &self,
        sqls: Vec<(BatchKey, String)>,
    ) -> Vec<(BatchKey, std::result::Result<Response, QueryError>)> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(sqls.len());

        for (key, sql) in sqls {
            let endpoint = self.endpoint.clone();
            let semaphore = Arc::clone(&semaphore);
            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.map_err(|e| {
                    QueryError::new(format!("ClickHouse request pool closed: {}", e))
                })?;
                endpoint.send(&sql, true).await
            });
            handles.push((key, handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (key, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(QueryError::new(format!("ClickHouse request task failed: {}", e))),
            };
            results.push((key, result));
        }
        results
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, sql: &str) -> std::result::Result<Response, QueryError> {
        let is_select = is_select_query(sql);
        debug!(
            "[CH_QUERY] Starting {}: \"{}\" (len={})",
            if is_select { "read" } else { "write" },
            sql_preview(sql),
            sql.len()
        );

        let started = Instant::now();
        let result = self.endpoint.send(sql, is_select).await;
        match &result {
            Ok(_) => debug!("[CH_QUERY] Success: total_ms={}", started.elapsed().as_millis()),
            Err(e) => warn!(
                "[CH_QUERY] Failed: \"{}\" error=\"{}\" total_ms={}",
                sql_preview(sql),
                e,
                started.elapsed().as_millis()
            ),
        }
        result
    }

    async fn execute_parallel(&self, sqls: Vec<(BatchKey, String)>) -> BatchOutcome<Response> {
        let count = sqls.len();
        debug!(
            "[CH_PARALLEL] Dispatching {} queries (concurrency={}, fan_out={:?})",
            count, self.concurrency, self.fan_out
        );

        let started = Instant::now();
        let results = match self.fan_out {
            FanOut::Multiplexed => self.run_multiplexed(sqls).await,
            FanOut::Spawned => self.run_spawned(sqls).await,
        };

        for (key, result) in &results {
            if let Err(e) = result {
                warn!("[CH_PARALLEL] Query [{}] failed: {}", key, e);
            }
        }
        debug!(
            "[CH_PARALLEL] Settled {} queries in {} ms",
            count,
            started.elapsed().as_millis()
        );

        collect_outcome(results)
    }
}
