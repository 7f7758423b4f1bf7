use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// One result row: column name to value, in the column order the server sent.
pub type Record = Map<String, JsonValue>;

/// Parsed result of one executed query.
///
/// For reads, `records` holds the rows and `affected_rows` is absent. For
/// writes, `records` is absent and `affected_rows` holds the server-reported
/// written row count, or `None` when the server did not report one. `None`
/// never means zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    sql: String,
    is_select: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    affected_rows: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    records: Option<Vec<Record>>,
}

impl Response {
    pub fn new(
        sql: impl Into<String>,
        is_select: bool,
        affected_rows: Option<u64>,
        records: Option<Vec<Record>>,
    ) -> Self {
        Self {
            sql: sql.into(),
            is_select,
            affected_rows,
            records,
        }
    }

    /// Response of a read.
    pub fn select(sql: impl Into<String>, records: Vec<Record>) -> Self {
        Self::new(sql, true, None, Some(records))
    }

    /// Response of a write.
    pub fn write(sql: impl Into<String>, affected_rows: Option<u64>) -> Self {
        Self::new(sql, false, affected_rows, None)
    }

    /// The raw SQL that produced this response.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn is_select(&self) -> bool {
        self.is_select
    }

    pub fn affected_rows(&self) -> Option<u64> {
        self.affected_rows
    }

    pub fn records(&self) -> Option<&[Record]> {
        self.records.as_deref()
    }

    /// Take the rows out of the response (empty for writes).
    pub fn into_records(self) -> Vec<Record> {
        self.records.unwrap_or_default()
    }
}
