use super::value::Value;
use crate::transport::classify::is_select_query;

/// A query compiled by an external query builder.
///
/// Holds the final SQL text with `?` placeholders, the ordered bindings for
/// those placeholders, and a hint telling whether the query only reads.
///
/// # Example
///
/// ```rust
/// use clickhouse_link::CompiledQuery;
///
/// let query = CompiledQuery::new("SELECT * FROM events WHERE id = ?").bind(7);
/// assert!(query.is_read());
/// assert_eq!(query.bindings().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    sql: String,
    bindings: Vec<Value>,
    is_read: bool,
}

impl CompiledQuery {
    /// Create a query; the read hint is derived from the SQL text.
    pub fn new(sql: impl Into<String>) -> Self {
        let sql = sql.into();
        let is_read = is_select_query(&sql);
        Self {
            sql,
            bindings: Vec::new(),
            is_read,
        }
    }

    /// Create a query with its full binding list.
    pub fn with_bindings(sql: impl Into<String>, bindings: Vec<Value>) -> Self {
        let mut query = Self::new(sql);
        query.bindings = bindings;
        query
    }

    /// Append the next positional binding.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.bindings.push(value.into());
        self
    }

    /// Override the read hint.
    pub fn read(mut self, is_read: bool) -> Self {
        self.is_read = is_read;
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn bindings(&self) -> &[Value] {
        &self.bindings
    }

    pub fn is_read(&self) -> bool {
        self.is_read
    }
}
