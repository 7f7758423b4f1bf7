//! Main ClickHouse client with builder pattern.
//!
//! Provides the primary interface for preparing statements, running raw SQL
//! and fanning keyed batches out concurrently.

use crate::{
    auth::AuthProvider,
    error::{LinkError, QueryError, Result},
    escaper::{EscapePolicy, Escaper},
    hooks::{QueryEvent, QueryHooks},
    models::{BatchKey, CompiledQuery, ConnectionOptions, HttpVersion, Record, Response, Value},
    parallel::ParallelExecutionError,
    statement::Statement,
    timeouts::LinkTimeouts,
    transport::{make_transport, HttpSettings, Transport, TransportKind},
};
use log::{debug, warn};
use std::{
    collections::BTreeMap,
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};

/// Main ClickHouse client.
///
/// Cheap to clone: clones share the transport and its connection pool.
/// Use [`ClickHouseClientBuilder`] to construct instances.
///
/// # Examples
///
/// ```rust,no_run
/// use clickhouse_link::ClickHouseClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ClickHouseClient::builder()
///     .host("localhost")
///     .timeout(std::time::Duration::from_secs(30))
///     .build()?;
///
/// let written = client.exec("INSERT INTO t SELECT number FROM numbers(10)").await?;
/// println!("wrote {} rows", written);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ClickHouseClient {
    transport: Arc<dyn Transport>,
    escaper: Escaper,
    hooks: QueryHooks,
}

impl fmt::Debug for ClickHouseClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClickHouseClient")
            .field("escaper", &self.escaper)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

impl ClickHouseClient {
    /// Create a new builder for configuring the client
    pub fn builder() -> ClickHouseClientBuilder {
        ClickHouseClientBuilder::new()
    }

    /// Client over an already constructed transport, with default escaping and no hooks.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            escaper: Escaper::default(),
            hooks: QueryHooks::default(),
        }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn escaper(&self) -> &Escaper {
        &self.escaper
    }

    pub fn hooks(&self) -> &QueryHooks {
        &self.hooks
    }

    /// Run raw SQL, returning the number of rows it wrote.
    ///
    /// Returns 0 when the server did not report a count (reads, DDL).
    pub async fn exec(&self, sql: &str) -> Result<u64> {
        let response = self.execute(sql).await?;
        Ok(response.affected_rows().unwrap_or(0))
    }

    /// Run raw SQL and return the server's parsed response.
    pub async fn execute(&self, sql: &str) -> Result<Response> {
        Ok(self.dispatch(sql, &[], sql).await?)
    }

    /// Prepare a statement with positional `?` placeholders.
    pub fn prepare(&self, template: impl Into<String>) -> Statement {
        Statement::new(self.clone(), template)
    }

    /// Prepare a statement from a compiled query, binding its values from 1.
    pub fn prepare_compiled(&self, query: &CompiledQuery) -> Statement {
        let mut statement = self.prepare(query.sql());
        statement.bind_values(query.bindings().iter().cloned());
        statement
    }

    /// Execute a keyed batch of statements concurrently.
    ///
    /// Every statement is rendered before anything is sent; a statement whose
    /// bindings fail to escape fails under its own key while the rest still run.
    /// All requests use read-only parameters. The call waits for every request
    /// to settle.
    ///
    /// On success every statement comes back with its response attached. If
    /// any key failed, the error holds the statements that completed next to
    /// the per-key failures. A key given twice keeps its last statement.
    ///
    /// Statements whose key failed are dropped and do not come back in either
    /// map. To retry a failed key, prepare and bind it again.
    pub async fn parallel<K, I>(
        &self,
        statements: I,
    ) -> std::result::Result<BTreeMap<BatchKey, Statement>, ParallelExecutionError<Statement>>
    where
        K: Into<BatchKey>,
        I: IntoIterator<Item = (K, Statement)>,
    {
        let pending: BTreeMap<BatchKey, Statement> = statements
            .into_iter()
            .map(|(key, statement)| (key.into(), statement))
            .collect();
        if pending.is_empty() {
            return Ok(BTreeMap::new());
        }

        let mut failed: BTreeMap<BatchKey, LinkError> = BTreeMap::new();
        let mut sqls = Vec::with_capacity(pending.len());
        for (key, statement) in &pending {
            match statement.to_raw_sql() {
                Ok(sql) => {
                    self.hooks
                        .emit_before_executing(statement.sql(), &binding_list(statement));
                    sqls.push((key.clone(), sql));
                },
                Err(e) => {
                    warn!("[CH_PARALLEL] Query [{}] not sent: {}", key, e);
                    failed.insert(key.clone(), e.into());
                },
            }
        }

        debug!(
            "[CH_PARALLEL] Batch of {} statements, {} dispatched",
            pending.len(),
            sqls.len()
        );

        let started = Instant::now();
        let (mut responses, transport_failures) = if sqls.is_empty() {
            (BTreeMap::new(), BTreeMap::new())
        } else {
            match self.transport.execute_parallel(sqls).await {
                Ok(responses) => (responses, BTreeMap::new()),
                Err(partial) => partial.into_parts(),
            }
        };
        let elapsed = started.elapsed();

        let mut succeeded = BTreeMap::new();
        for (key, mut statement) in pending {
            if let Some(response) = responses.remove(&key) {
                self.report(&statement, elapsed, true);
                statement.attach_response(response);
                succeeded.insert(key, statement);
            } else if transport_failures.contains_key(&key) {
                self.report(&statement, elapsed, false);
            } else if !failed.contains_key(&key) {
                failed.insert(
                    key,
                    QueryError::new("ClickHouse returned no result for this query").into(),
                );
            }
        }
        failed.extend(transport_failures);

        if failed.is_empty() {
            Ok(succeeded)
        } else {
            Err(ParallelExecutionError::new(succeeded, failed))
        }
    }

    /// Run a read and return its rows.
    pub async fn select(&self, sql: &str, bindings: Vec<Value>) -> Result<Vec<Record>> {
        let mut statement = self.prepare(sql);
        statement.bind_values(bindings);
        statement.execute().await?;
        Ok(statement.into_records())
    }

    /// Run a statement, returning `true` once the server accepted it.
    pub async fn statement(&self, sql: &str, bindings: Vec<Value>) -> Result<bool> {
        let mut statement = self.prepare(sql);
        statement.bind_values(bindings);
        statement.execute().await
    }

    /// Run a write and return the number of rows it affected (0 if unknown).
    pub async fn affecting_statement(&self, sql: &str, bindings: Vec<Value>) -> Result<u64> {
        let mut statement = self.prepare(sql);
        statement.bind_values(bindings);
        statement.execute().await?;
        Ok(statement.row_count().unwrap_or(0))
    }

    /// Run a compiled query and return the server's response.
    pub async fn run(&self, query: &CompiledQuery) -> Result<Response> {
        let mut statement = self.prepare_compiled(query);
        statement.execute().await?;
        statement
            .into_response()
            .ok_or_else(|| QueryError::new("ClickHouse returned no result for this query").into())
    }

    /// Run a keyed batch of compiled reads concurrently and return their rows.
    ///
    /// An empty batch returns an empty map without contacting the server.
    pub async fn select_parallel<K, I>(
        &self,
        queries: I,
    ) -> std::result::Result<BTreeMap<BatchKey, Vec<Record>>, ParallelExecutionError<Vec<Record>>>
    where
        K: Into<BatchKey>,
        I: IntoIterator<Item = (K, CompiledQuery)>,
    {
        let statements: Vec<(BatchKey, Statement)> = queries
            .into_iter()
            .map(|(key, query)| {
                let key = key.into();
                if !query.is_read() {
                    warn!(
                        "[CH_PARALLEL] Query [{}] is not a read but will be sent read-only",
                        key
                    );
                }
                (key, self.prepare_compiled(&query))
            })
            .collect();

        if statements.is_empty() {
            return Ok(BTreeMap::new());
        }

        self.parallel(statements)
            .await
            .map(|executed| {
                executed
                    .into_iter()
                    .map(|(key, statement)| (key, statement.into_records()))
                    .collect()
            })
            .map_err(|partial| partial.map(Statement::into_records))
    }

    /// Send rendered SQL through the transport, reporting it to the hooks.
    ///
    /// `template` and `bindings` are what the hooks see; `raw_sql` is what is sent.
    pub(crate) async fn dispatch(
        &self,
        template: &str,
        bindings: &[Value],
        raw_sql: &str,
    ) -> std::result::Result<Response, QueryError> {
        self.hooks.emit_before_executing(template, bindings);
        let started = Instant::now();
        let result = self.transport.execute(raw_sql).await;
        if self.hooks.on_query.is_some() {
            self.hooks.emit_query(&QueryEvent::new(
                template,
                bindings.to_vec(),
                started.elapsed(),
                result.is_ok(),
            ));
        }
        result
    }

    fn report(&self, statement: &Statement, elapsed: Duration, success: bool) {
        if self.hooks.on_query.is_some() {
            self.hooks.emit_query(&QueryEvent::new(
                statement.sql(),
                binding_list(statement),
                elapsed,
                success,
            ));
        }
    }
}

fn binding_list(statement: &Statement) -> Vec<Value> {
    statement.bindings().values().cloned().collect()
}

/// Builder for configuring [`ClickHouseClient`] instances.
pub struct ClickHouseClientBuilder {
    settings: HttpSettings,
    transport_kind: TransportKind,
    transport: Option<Arc<dyn Transport>>,
    escaper: Escaper,
    hooks: QueryHooks,
}

impl ClickHouseClientBuilder {
    fn new() -> Self {
        Self {
            settings: HttpSettings::default(),
            transport_kind: TransportKind::default(),
            transport: None,
            escaper: Escaper::default(),
            hooks: QueryHooks::default(),
        }
    }

    /// Server host name or address (default `localhost`)
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.settings.host = host.into();
        self
    }

    /// HTTP interface port (default 8123)
    pub fn port(mut self, port: u16) -> Self {
        self.settings.port = port;
        self
    }

    /// Database queries run against (default `default`)
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.settings.database = database.into();
        self
    }

    /// Authenticate with the ClickHouse user/key headers
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.settings.auth = AuthProvider::headers(username.into(), password.into());
        self
    }

    /// Set authentication provider directly
    ///
    /// # Example
    ///
    /// ```rust
    /// use clickhouse_link::{AuthProvider, ClickHouseClient};
    ///
    /// # fn example() -> clickhouse_link::Result<()> {
    /// let client = ClickHouseClient::builder()
    ///     .auth(AuthProvider::basic_auth("alice".to_string(), "secret".to_string()))
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn auth(mut self, auth: AuthProvider) -> Self {
        self.settings.auth = auth;
        self
    }

    /// Use `https` instead of `http`
    pub fn https(mut self, https: bool) -> Self {
        self.settings.connection_options.https = https;
        self
    }

    /// Select the transport implementation (default [`TransportKind::Http`])
    pub fn transport_kind(mut self, kind: TransportKind) -> Self {
        self.transport_kind = kind;
        self
    }

    /// Use an already constructed transport.
    ///
    /// Connection settings on this builder are ignored when a transport is given.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set connection and request timeouts
    pub fn timeouts(mut self, timeouts: LinkTimeouts) -> Self {
        self.settings.timeouts = timeouts;
        self
    }

    /// Set the whole-request timeout only
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeouts.request_timeout = timeout;
        self
    }

    /// Set connection options (HTTP version, TLS, pooling, extra headers)
    pub fn connection_options(mut self, options: ConnectionOptions) -> Self {
        self.settings.connection_options = options;
        self
    }

    /// Set the HTTP protocol version to use
    pub fn http_version(mut self, version: HttpVersion) -> Self {
        self.settings.connection_options.http_version = version;
        self
    }

    /// Add a header sent with every request
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings
            .connection_options
            .headers
            .insert(name.into(), value.into());
        self
    }

    /// Maximum number of parallel requests in flight (default 10)
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.settings.concurrency = concurrency;
        self
    }

    pub fn escaper(mut self, escaper: Escaper) -> Self {
        self.escaper = escaper;
        self
    }

    /// Shorthand for an escaper with the given policy
    pub fn escape_policy(mut self, policy: EscapePolicy) -> Self {
        self.escaper = Escaper::with_policy(policy);
        self
    }

    pub fn hooks(mut self, hooks: QueryHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Build the client
    pub fn build(self) -> Result<ClickHouseClient> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                if self.settings.database.trim().is_empty() {
                    return Err(LinkError::ConfigurationError("database is required".into()));
                }
                debug!(
                    "[CH_CLIENT] Connecting to {} (database={}, transport={})",
                    self.settings.base_url(),
                    self.settings.database,
                    self.transport_kind
                );
                make_transport(self.transport_kind, &self.settings)?
            },
        };

        Ok(ClickHouseClient {
            transport,
            escaper: self.escaper,
            hooks: self.hooks,
        })
    }
}
