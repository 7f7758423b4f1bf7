//! # clickhouse-link: ClickHouse HTTP Client Library
//!
//! A client library for issuing SQL statements against a ClickHouse server
//! over its HTTP interface.
//!
//! ## Features
//!
//! - **Value Escaping**: Typed values rendered as ClickHouse SQL literals
//! - **Prepared Statements**: Positional `?` placeholders substituted outside string literals
//! - **Parallel Execution**: Keyed batches fanned out with bounded concurrency,
//!   reporting per-key results and per-key failures together
//! - **Pluggable Transport**: HTTP transports selected at construction time, or injected
//! - **Configurable Timeouts**: Connection and request timeouts
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use clickhouse_link::ClickHouseClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ClickHouseClient::builder()
//!         .host("localhost")
//!         .port(8123)
//!         .database("default")
//!         .credentials("default", "")
//!         .build()?;
//!
//!     let mut statement = client.prepare("SELECT * FROM events WHERE kind = ? LIMIT ?");
//!     statement.bind_value(1, "click");
//!     statement.bind_value(2, 10);
//!     statement.execute().await?;
//!
//!     for record in statement.fetch_all().unwrap_or_default() {
//!         println!("{:?}", record);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Parallel Execution
//!
//! ```rust,no_run
//! use clickhouse_link::ClickHouseClient;
//!
//! # async fn example(client: ClickHouseClient) -> Result<(), Box<dyn std::error::Error>> {
//! let batch = vec![
//!     ("daily", client.prepare("SELECT count() AS c FROM events WHERE day = today()")),
//!     ("total", client.prepare("SELECT count() AS c FROM events")),
//! ];
//!
//! match client.parallel(batch).await {
//!     Ok(statements) => {
//!         for (key, statement) in &statements {
//!             println!("{}: {:?}", key, statement.fetch_all());
//!         }
//!     }
//!     Err(partial) => {
//!         for (key, statement) in partial.succeeded() {
//!             println!("{} completed: {:?}", key, statement.fetch_all());
//!         }
//!         for (key, error) in partial.failed() {
//!             eprintln!("{} failed: {}", key, error);
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod escaper;
pub mod hooks;
pub mod models;
pub mod parallel;
pub mod statement;
pub mod timeouts;
pub mod transport;

// Re-export main types for convenience
pub use auth::AuthProvider;
pub use client::{ClickHouseClient, ClickHouseClientBuilder};
pub use config::ClickHouseConfig;
pub use error::{EscapeError, LinkError, QueryError, Result};
pub use escaper::{EscapePolicy, Escaper};
pub use hooks::{QueryEvent, QueryHooks};
pub use models::{
    BatchKey, CompiledQuery, ConnectionOptions, HttpVersion, Record, Response, Value,
};
pub use parallel::{BatchOutcome, ParallelExecutionError};
pub use statement::{to_raw_sql, Statement};
pub use timeouts::{LinkTimeouts, LinkTimeoutsBuilder};
pub use transport::{HttpTransport, Transport, TransportKind};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
