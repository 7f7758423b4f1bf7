//! Wire transports that carry raw SQL to ClickHouse and back.
//!
//! [`Transport`] is the seam between the client and the network: one call
//! for a single statement, one for a keyed batch run concurrently. The HTTP
//! implementation lives in [`http`]; [`factory`] picks one by [`TransportKind`].

pub mod classify;
pub mod factory;
pub mod http;
pub mod parse;

use crate::error::QueryError;
use crate::models::{BatchKey, Response};
use crate::parallel::BatchOutcome;
use async_trait::async_trait;

pub use factory::{make_transport, HttpSettings, TransportKind};
pub use http::HttpTransport;

/// Moves raw SQL to the server and parses what comes back.
///
/// Implementations are shared behind an `Arc` and must be usable from many
/// tasks at once; every call is self-contained.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute one statement.
    async fn execute(&self, sql: &str) -> Result<Response, QueryError>;

    /// Execute a keyed batch of read statements concurrently.
    ///
    /// Waits for every entry to settle. Results come back under the same keys;
    /// if any entry failed the outcome is a partial failure carrying both the
    /// completed responses and the per-key errors.
    async fn execute_parallel(&self, sqls: Vec<(BatchKey, String)>) -> BatchOutcome<Response>;
}
