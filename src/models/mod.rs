//! Data models for clickhouse-link.
//!
//! Defines the values bound into statements, the parsed server responses,
//! batch keys and connection-level options.

pub mod batch_key;
pub mod compiled_query;
pub mod connection_options;
pub mod http_version;
pub mod response;
pub mod value;


pub use batch_key::BatchKey;
pub use compiled_query::CompiledQuery;
pub use connection_options::ConnectionOptions;
pub use http_version::HttpVersion;
pub use response::{Record, Response};
pub use value::Value;
