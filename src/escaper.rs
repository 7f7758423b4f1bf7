//! Value escaping for ClickHouse SQL literals.
//!
//! Turns [`Value`]s into literal text that can be spliced directly into a SQL
//! string:
//!
//! | Value                | Literal                              |
//! |----------------------|--------------------------------------|
//! | `Null`               | `null`                               |
//! | `Int`/`UInt`/`Float` | decimal text, unquoted               |
//! | `Bool`               | `1` / `0`                            |
//! | `DateTime`           | `'YYYY-MM-DD HH:MM:SS'`              |
//! | `String`/`Bytes`     | `'...'` with `\` and `'` backslashed |
//! | `Array`              | `[a, b, ...]`, recursively           |

use crate::error::EscapeError;
use crate::models::Value;
use std::collections::BTreeMap;

/// Default layout for date/time values.
pub const DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Formatting policy applied by the [`Escaper`].
///
/// Date/time layout is explicit here rather than read from process state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscapePolicy {
    /// `chrono` strftime layout used for [`Value::DateTime`].
    pub datetime_format: String,
}

impl Default for EscapePolicy {
    fn default() -> Self {
        Self {
            datetime_format: DEFAULT_DATETIME_FORMAT.to_string(),
        }
    }
}

/// Renders values as ClickHouse SQL literals.
///
/// # Examples
///
/// ```rust
/// use clickhouse_link::{Escaper, Value};
///
/// let escaper = Escaper::new();
/// assert_eq!(escaper.escape(&Value::Null).unwrap(), "null");
/// assert_eq!(escaper.escape(&"it's".into()).unwrap(), r"'it\'s'");
/// assert_eq!(escaper.escape(&vec![1, 2].into()).unwrap(), "[1, 2]");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Escaper {
    policy: EscapePolicy,
}

impl Escaper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: EscapePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &EscapePolicy {
        &self.policy
    }

    /// Escape a value into SQL literal text.
    pub fn escape(&self, value: &Value) -> Result<String, EscapeError> {
        match value {
            Value::Null => Ok("null".to_string()),
            Value::Array(values) => self.escape_array(values),
            Value::Int(i) => Ok(i.to_string()),
            Value::UInt(u) => Ok(u.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::Bool(b) => Ok(escape_bool(*b).to_string()),
            Value::DateTime(dt) => {
                let formatted = dt.format(&self.policy.datetime_format).to_string();
                escape_checked_str(&formatted)
            },
            Value::String(s) => escape_checked_str(s),
            Value::Bytes(bytes) => {
                // NUL is checked first so it wins over an encoding failure
                if bytes.contains(&0) {
                    return Err(EscapeError::NullByte);
                }
                let s = std::str::from_utf8(bytes).map_err(|_| EscapeError::InvalidUtf8)?;
                escape_checked_str(s)
            },
        }
    }

    /// Escape a plain string.
    pub fn quote(&self, value: &str) -> Result<String, EscapeError> {
        escape_checked_str(value)
    }

    /// Escape each element and join them as an array literal.
    pub fn escape_array(&self, values: &[Value]) -> Result<String, EscapeError> {
        let parts = values
            .iter()
            .map(|v| self.escape(v))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(format!("[{}]", parts.join(", ")))
    }

    /// Binary-safe escaping.
    ///
    /// Not supported by the HTTP text interface; always fails.
    pub fn escape_binary(&self, _value: &Value) -> Result<String, EscapeError> {
        Err(EscapeError::BinaryUnsupported)
    }

    /// Escape a positional binding map, in ascending index order.
    pub fn escape_all(&self, bindings: &BTreeMap<usize, Value>) -> Result<Vec<String>, EscapeError> {
        bindings.values().map(|v| self.escape(v)).collect()
    }
}

fn escape_bool(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

fn escape_checked_str(value: &str) -> Result<String, EscapeError> {
    if value.contains('\0') {
        return Err(EscapeError::NullByte);
    }
    Ok(escape_string(value))
}

/// Wrap in single quotes, doubling backslashes and backslash-escaping quotes.
fn escape_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            _ => out.push(ch),
        }
    }
    out.push('\'');
    out
}
