//! Read/write classification of raw SQL.

use crate::statement::{SqlToken, SqlTokens};
use once_cell::sync::Lazy;
use regex::Regex;

static READ_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(select|with)\b").expect("valid read prefix regex"));

static UNION_CLAUSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bunion\b").expect("valid union regex"));

/// Whether `sql` reads rows.
///
/// A statement is a read when it starts with `SELECT` or `WITH`, or when it
/// contains a `UNION` sub-clause. Everything else is a write. `union` inside a
/// string literal does not count.
pub fn is_select_query(sql: &str) -> bool {
    READ_PREFIX.is_match(sql) || UNION_CLAUSE.is_match(&blank_literals(sql))
}

/// `sql` with every quote and every character of a string literal turned
/// into a space.
fn blank_literals(sql: &str) -> String {
    SqlTokens::new(sql)
        .map(|token| match token {
            SqlToken::Char(ch, false) => ch,
            _ => ' ',
        })
        .collect()
}
