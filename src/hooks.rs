//! Query lifecycle callbacks.
//!
//! - [`before_executing`](QueryHooks::before_executing): fired with the SQL
//!   template and its bindings right before a query goes to the transport
//! - [`on_query`](QueryHooks::on_query): fired once the query has settled,
//!   with timing and outcome
//!
//! # Example
//!
//! ```rust
//! use clickhouse_link::QueryHooks;
//!
//! let hooks = QueryHooks::new()
//!     .before_executing(|sql, bindings| {
//!         println!("about to run {} with {} bindings", sql, bindings.len());
//!     })
//!     .on_query(|event| {
//!         println!("{} took {:?}", event.sql, event.elapsed);
//!     });
//! assert!(hooks.has_any());
//! ```

use crate::models::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A settled query, as reported to [`QueryHooks::on_query`].
#[derive(Debug, Clone)]
pub struct QueryEvent {
    /// SQL template, placeholders not substituted.
    pub sql: String,
    pub bindings: Vec<Value>,
    /// Wall-clock time spent waiting on the transport.
    pub elapsed: Duration,
    pub success: bool,
}

impl QueryEvent {
    pub fn new(sql: impl Into<String>, bindings: Vec<Value>, elapsed: Duration, success: bool) -> Self {
        Self {
            sql: sql.into(),
            bindings,
            elapsed,
            success,
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_micros() as f64 / 1000.0
    }
}

impl fmt::Display for QueryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:.2} ms, {})",
            self.sql,
            self.elapsed_ms(),
            if self.success { "ok" } else { "failed" }
        )
    }
}

pub type BeforeExecutingCallback = Arc<dyn Fn(&str, &[Value]) + Send + Sync>;

pub type OnQueryCallback = Arc<dyn Fn(&QueryEvent) + Send + Sync>;

/// Optional callbacks invoked around every query the client runs.
#[derive(Clone, Default)]
pub struct QueryHooks {
    pub(crate) before_executing: Vec<BeforeExecutingCallback>,
    pub(crate) on_query: Option<OnQueryCallback>,
}

impl fmt::Debug for QueryHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryHooks")
            .field("before_executing", &self.before_executing.len())
            .field("on_query", &self.on_query.is_some())
            .finish()
    }
}

impl QueryHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback run before each query is sent.
    ///
    /// Several callbacks may be registered; they run in registration order.
    pub fn before_executing(mut self, f: impl Fn(&str, &[Value]) + Send + Sync + 'static) -> Self {
        self.before_executing.push(Arc::new(f));
        self
    }

    /// Register the callback receiving a [`QueryEvent`] for every settled query.
    ///
    /// Registering again replaces the previous callback.
    pub fn on_query(mut self, f: impl Fn(&QueryEvent) + Send + Sync + 'static) -> Self {
        self.on_query = Some(Arc::new(f));
        self
    }

    pub fn has_any(&self) -> bool {
        !self.before_executing.is_empty() || self.on_query.is_some()
    }

    pub(crate) fn emit_before_executing(&self, sql: &str, bindings: &[Value]) {
        for cb in &self.before_executing {
            cb(sql, bindings);
        }
    }

    pub(crate) fn emit_query(&self, event: &QueryEvent) {
        if let Some(cb) = &self.on_query {
            cb(event);
        }
    }
}
