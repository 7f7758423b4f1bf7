//! Prepared statements with positional `?` placeholders.
//!
//! Placeholders are substituted by a single left-to-right scan that tracks
//! whether it is inside a single-quoted string literal, so a `?` that is part
//! of literal text is never replaced.

use crate::client::ClickHouseClient;
use crate::error::{EscapeError, Result};
use crate::models::{Record, Response, Value};
use log::debug;
use std::collections::BTreeMap;
use std::fmt;

/// Substitute already-escaped bindings into the `?` placeholders of `template`.
///
/// - `''` (doubled quote) and the backslash escapes `\'` and `\\` are copied
///   through as a pair and never open or close a literal.
/// - A lone `'` opens or closes a literal.
/// - A `?` outside a literal takes the next binding; when none remain the `?`
///   is left as is.
///
/// Bindings left over after the last placeholder are ignored. Both this and
/// the unfilled-placeholder case are permissive on purpose; callers that want
/// strict counts must check them before calling.
///
/// # Example
///
/// ```rust
/// use clickhouse_link::to_raw_sql;
///
/// let sql = to_raw_sql("select '?' from t where a = ?", ["5"]);
/// assert_eq!(sql, "select '?' from t where a = 5");
/// ```
pub fn to_raw_sql<I, S>(template: &str, escaped_bindings: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut bindings = escaped_bindings.into_iter();
    let mut sql = String::with_capacity(template.len());

    for token in SqlTokens::new(template) {
        match token {
            SqlToken::Pair(first, second) => {
                sql.push(first);
                sql.push(second);
            },
            SqlToken::Quote => sql.push('\''),
            SqlToken::Char('?', false) => match bindings.next() {
                Some(binding) => sql.push_str(binding.as_ref()),
                None => sql.push('?'),
            },
            SqlToken::Char(ch, _) => sql.push(ch),
        }
    }

    if bindings.next().is_some() {
        debug!("[CH_STATEMENT] More bindings than placeholders; extra bindings ignored");
    }

    sql
}

/// A step of the single-quote aware scan over SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SqlToken {
    /// `''`, `\'` or `\\`: copied as is, never opens or closes a literal.
    Pair(char, char),
    /// A lone `'`, which toggles the literal state.
    Quote,
    /// Any other character, with whether it sits inside a literal.
    Char(char, bool),
}

/// Splits SQL into [`SqlToken`]s, tracking single-quoted literals.
pub(crate) struct SqlTokens<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    in_literal: bool,
}

impl<'a> SqlTokens<'a> {
    pub(crate) fn new(sql: &'a str) -> Self {
        Self {
            chars: sql.chars().peekable(),
            in_literal: false,
        }
    }
}

impl Iterator for SqlTokens<'_> {
    type Item = SqlToken;

    fn next(&mut self) -> Option<SqlToken> {
        let ch = self.chars.next()?;
        let token = match (ch, self.chars.peek().copied()) {
            ('\'', Some('\'')) | ('\\', Some('\'')) | ('\\', Some('\\')) => {
                SqlToken::Pair(ch, self.chars.next().unwrap_or_default())
            },
            ('\'', _) => {
                self.in_literal = !self.in_literal;
                SqlToken::Quote
            },
            _ => SqlToken::Char(ch, self.in_literal),
        };
        Some(token)
    }
}

/// A parameterized query bound to a client.
///
/// Created by [`ClickHouseClient::prepare`]. Bindings are attached by 1-based
/// index, `execute` runs the statement and captures the response, and
/// `fetch_all`/`row_count` read it back.
///
/// A statement is not meant to be shared: bind and execute through `&mut self`.
pub struct Statement {
    client: ClickHouseClient,
    template: String,
    bindings: BTreeMap<usize, Value>,
    response: Option<Response>,
}

impl Statement {
    pub(crate) fn new(client: ClickHouseClient, template: impl Into<String>) -> Self {
        Self {
            client,
            template: template.into(),
            bindings: BTreeMap::new(),
            response: None,
        }
    }

    /// Record or overwrite the value for a 1-based placeholder position.
    pub fn bind_value(&mut self, index: usize, value: impl Into<Value>) -> bool {
        self.bindings.insert(index, value.into());
        true
    }

    /// Bind a sequence of values to positions 1, 2, ...
    pub fn bind_values<I, V>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        for (i, value) in values.into_iter().enumerate() {
            self.bindings.insert(i + 1, value.into());
        }
        self
    }

    /// The SQL template as prepared.
    pub fn sql(&self) -> &str {
        &self.template
    }

    pub fn bindings(&self) -> &BTreeMap<usize, Value> {
        &self.bindings
    }

    /// Render the template with the current bindings escaped into place.
    pub fn to_raw_sql(&self) -> std::result::Result<String, EscapeError> {
        let escaped = self.client.escaper().escape_all(&self.bindings)?;
        Ok(to_raw_sql(&self.template, escaped))
    }

    /// Execute the statement, replacing any previously captured response.
    ///
    /// Returns `Ok(true)` once the server answered; query failures are errors.
    pub async fn execute(&mut self) -> Result<bool> {
        let sql = self.to_raw_sql()?;
        let bindings: Vec<Value> = self.bindings.values().cloned().collect();
        let response = self.client.dispatch(&self.template, &bindings, &sql).await?;
        self.response = Some(response);
        Ok(true)
    }

    /// Rows of the captured response; `None` before execution or for writes.
    pub fn fetch_all(&self) -> Option<&[Record]> {
        self.response.as_ref().and_then(Response::records)
    }

    /// Affected row count of the captured response, when the server reported one.
    pub fn row_count(&self) -> Option<u64> {
        self.response.as_ref().and_then(Response::affected_rows)
    }

    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    /// Attach a response obtained outside `execute` (used by parallel execution).
    pub fn attach_response(&mut self, response: Response) {
        self.response = Some(response);
    }

    pub fn into_response(self) -> Option<Response> {
        self.response
    }

    /// Consume the statement, returning its rows (empty if none were captured).
    pub fn into_records(self) -> Vec<Record> {
        self.response.map(Response::into_records).unwrap_or_default()
    }
}

impl fmt::Debug for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("template", &self.template)
            .field("bindings", &self.bindings)
            .field("response", &self.response)
            .finish()
    }
}
