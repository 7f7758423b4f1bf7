//! Parsing of ClickHouse HTTP replies.
//!
//! Reads come back as `default_format=JSON` bodies with a top-level `data`
//! array. Writes report their written row count in the `X-ClickHouse-Summary`
//! header. Errors come back as plain text of the form
//! `Code: <n>. DB::Exception: <message> (version ...)`.

use crate::error::QueryError;
use crate::models::{Record, Response};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as JsonValue;

/// Header carrying the write summary.
pub const SUMMARY_HEADER: &str = "X-ClickHouse-Summary";

static CLICKHOUSE_ERROR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)Code:\s(\d+)\.\s*DB::Exception\s*:\s*(.*)(?:,\s*e\.what|\(version).*")
        .expect("valid ClickHouse error regex")
});

/// The parts of an HTTP reply the parser looks at.
#[derive(Debug, Clone, PartialEq)]
pub struct RawReply {
    pub status: u16,
    pub content_type: String,
    pub summary: Option<String>,
    pub body: String,
}

impl RawReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Decode a ClickHouse error body into its exception code and message.
pub fn parse_clickhouse_error(body: &str) -> Option<(u32, String)> {
    let caps = CLICKHOUSE_ERROR.captures(body)?;
    let code = caps.get(1)?.as_str().parse().ok()?;
    let message = caps.get(2)?.as_str().trim().to_string();
    Some((code, message))
}

/// Turn a reply into a [`Response`], or the error it describes.
///
/// A non-2xx reply is always an error. If its body still parses as a regular
/// response, that response is attached to the error so the caller can inspect
/// what the server sent.
pub fn parse_reply(sql: &str, is_select: bool, reply: &RawReply) -> Result<Response, QueryError> {
    let parsed = parse_body(sql, is_select, reply);

    if reply.is_success() {
        return parsed;
    }

    match parsed {
        Ok(response) => Err(QueryError::new(format!(
            "ClickHouse request failed: HTTP {}: {}",
            reply.status,
            reply.body.trim()
        ))
        .with_status(reply.status)
        .with_response(response)),
        Err(err) => Err(err.with_status(reply.status)),
    }
}

fn parse_body(sql: &str, is_select: bool, reply: &RawReply) -> Result<Response, QueryError> {
    if !reply.content_type.contains("application/json") {
        if let Some((code, message)) = parse_clickhouse_error(&reply.body) {
            return Err(QueryError::new(format!("ClickHouse query error: {}", message)).with_code(code));
        }
    }

    if is_select {
        Ok(Response::select(sql, parse_records(&reply.body)?))
    } else {
        Ok(Response::write(sql, parse_affected_rows(reply.summary.as_deref())))
    }
}

/// Extract the `data` rows of a JSON-format body.
pub fn parse_records(body: &str) -> Result<Vec<Record>, QueryError> {
    let parsing_error = || QueryError::new(format!("ClickHouse response parsing error: {}", body));

    let mut document: JsonValue = serde_json::from_str(body).map_err(|_| parsing_error())?;
    let data = match document.get_mut("data").map(JsonValue::take) {
        Some(JsonValue::Array(rows)) => rows,
        _ => return Err(parsing_error()),
    };

    data.into_iter()
        .map(|row| match row {
            JsonValue::Object(record) => Ok(record),
            _ => Err(parsing_error()),
        })
        .collect()
}

/// Read `written_rows` from the summary header.
///
/// Returns `None` when the header is missing, is not JSON, or has no numeric
/// `written_rows`. ClickHouse sends the count as a string.
pub fn parse_affected_rows(summary: Option<&str>) -> Option<u64> {
    let summary = summary?.trim();
    if summary.is_empty() {
        return None;
    }

    let parsed: JsonValue = serde_json::from_str(summary).ok()?;
    match parsed.get("written_rows")? {
        JsonValue::String(s) => s.trim().parse().ok(),
        JsonValue::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reply(status: u16, content_type: &str, summary: Option<&str>, body: &str) -> RawReply {
        RawReply {
            status,
            content_type: content_type.to_string(),
            summary: summary.map(str::to_string),
            body: body.to_string(),
        }
    }

    const JSON: &str = "application/json; charset=UTF-8";
    const TEXT: &str = "text/plain; charset=UTF-8";

    #[test]
    fn test_parse_select() {
        let body = r#"{"meta":[{"name":"x","type":"UInt8"}],"data":[{"x":1},{"x":2}],"rows":2}"#;
        let response = parse_reply("SELECT x", true, &reply(200, JSON, None, body)).unwrap();

        assert!(response.is_select());
        assert_eq!(response.sql(), "SELECT x");
        let records = response.records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("x"), Some(&json!(1)));
    }

    #[test]
    fn test_parse_select_requires_data_array() {
        let err = parse_reply("SELECT 1", true, &reply(200, JSON, None, r#"{"rows":0}"#)).unwrap_err();
        assert!(err.message().starts_with("ClickHouse response parsing error"));

        let err = parse_reply("SELECT 1", true, &reply(200, JSON, None, "not json")).unwrap_err();
        assert!(err.message().contains("not json"));

        let err = parse_reply("SELECT 1", true, &reply(200, JSON, None, r#"{"data":[1]}"#)).unwrap_err();
        assert!(err.message().starts_with("ClickHouse response parsing error"));
    }

    #[test]
    fn test_parse_write_summary() {
        let summary = r#"{"read_rows":"0","read_bytes":"0","written_rows":"3","written_bytes":"24"}"#;
        let response = parse_reply("INSERT", false, &reply(200, TEXT, Some(summary), "")).unwrap();

        assert!(!response.is_select());
        assert_eq!(response.affected_rows(), Some(3));
        assert!(response.records().is_none());
    }

    #[test]
    fn test_parse_write_without_summary_is_absent() {
        let response = parse_reply("INSERT", false, &reply(200, TEXT, None, "")).unwrap();
        assert_eq!(response.affected_rows(), None);
    }

    #[test]
    fn test_affected_rows_variants() {
        assert_eq!(parse_affected_rows(Some(r#"{"written_rows":"0"}"#)), Some(0));
        assert_eq!(parse_affected_rows(Some(r#"{"written_rows":12}"#)), Some(12));
        assert_eq!(parse_affected_rows(Some(r#"{"written_rows":"abc"}"#)), None);
        assert_eq!(parse_affected_rows(Some(r#"{"read_rows":"5"}"#)), None);
        assert_eq!(parse_affected_rows(Some("garbage")), None);
        assert_eq!(parse_affected_rows(Some("")), None);
        assert_eq!(parse_affected_rows(None), None);
    }

    #[test]
    fn test_clickhouse_error_text() {
        let body = "Code: 60. DB::Exception: Table default.missing does not exist. (UNKNOWN_TABLE) (version 23.8.2.7 (official build))\n";
        let err = parse_reply("SELECT * FROM missing", true, &reply(404, TEXT, None, body)).unwrap_err();

        assert_eq!(err.code(), Some(60));
        assert_eq!(err.status(), Some(404));
        assert_eq!(
            err.message(),
            "ClickHouse query error: Table default.missing does not exist. (UNKNOWN_TABLE)"
        );
        assert!(err.response().is_none());
    }

    #[test]
    fn test_clickhouse_error_legacy_format() {
        let body = "Code: 62, e.displayText() = DB::Exception: Syntax error, e.what() = DB::Exception";
        assert!(parse_clickhouse_error(body).is_none());

        let body = "Code: 62. DB::Exception: Syntax error: failed at position 1, e.what() = DB::Exception";
        let (code, message) = parse_clickhouse_error(body).unwrap();
        assert_eq!(code, 62);
        assert_eq!(message, "Syntax error: failed at position 1");
    }

    #[test]
    fn test_error_text_in_json_content_type_is_not_decoded() {
        let body = "Code: 60. DB::Exception: nope (version 1)";
        let err = parse_reply("SELECT 1", true, &reply(200, JSON, None, body)).unwrap_err();
        assert_eq!(err.code(), None);
        assert!(err.message().starts_with("ClickHouse response parsing error"));
    }

    #[test]
    fn test_failed_status_with_parseable_body_keeps_response() {
        let body = r#"{"data":[{"partial":1}]}"#;
        let err = parse_reply("SELECT 1", true, &reply(500, JSON, None, body)).unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert!(err.message().starts_with("ClickHouse request failed: HTTP 500"));
        let response = err.response().unwrap();
        assert_eq!(response.records().unwrap()[0].get("partial"), Some(&json!(1)));
    }
}
