use crate::error::EscapeError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use serde_json::Value as JsonValue;
use std::fmt;

/// A value bound to a statement placeholder.
///
/// Values are immutable and rendered to SQL literal text by the
/// [`Escaper`](crate::Escaper).
///
/// # Examples
///
/// ```rust
/// use clickhouse_link::Value;
///
/// let id: Value = 42.into();
/// let name: Value = "alice".into();
/// let tags: Value = vec!["a", "b"].into();
/// let missing: Value = Option::<i64>::None.into();
///
/// assert_eq!(missing, Value::Null);
/// assert_eq!(tags, Value::Array(vec!["a".into(), "b".into()]));
/// # let _ = (id, name);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    /// String content of unknown encoding; must be valid UTF-8 to be escaped.
    Bytes(Vec<u8>),
    /// Wall-clock date and time, no timezone, no sub-second precision on output.
    DateTime(NaiveDateTime),
    Array(Vec<Value>),
}

impl Value {
    /// Build a string value from anything with a string conversion.
    pub fn display(value: impl fmt::Display) -> Self {
        Value::String(value.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::DateTime(_) => "datetime",
            Value::Array(_) => "array",
        }
    }
}

macro_rules! impl_from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(v as i64)
            }
        })*
    };
}

macro_rules! impl_from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::UInt(v as u64)
            }
        })*
    };
}

impl_from_signed!(i8, i16, i32, i64, isize);
impl_from_unsigned!(u8, u16, u32, u64, usize);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::String(v.clone())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::DateTime(v.and_time(chrono::NaiveTime::MIN))
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Value {
    /// Uses the wall-clock time in the value's own zone.
    fn from(v: DateTime<Tz>) -> Self {
        Value::DateTime(v.naive_local())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl TryFrom<JsonValue> for Value {
    type Error = EscapeError;

    /// JSON objects have no literal form in this scheme and are rejected.
    fn try_from(v: JsonValue) -> Result<Self, Self::Error> {
        match v {
            JsonValue::Null => Ok(Value::Null),
            JsonValue::Bool(b) => Ok(Value::Bool(b)),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Value::Int(i))
                } else if let Some(u) = n.as_u64() {
                    Ok(Value::UInt(u))
                } else {
                    n.as_f64()
                        .map(Value::Float)
                        .ok_or_else(|| EscapeError::UnsupportedType(format!("number {}", n)))
                }
            },
            JsonValue::String(s) => Ok(Value::String(s)),
            JsonValue::Array(items) => items
                .into_iter()
                .map(Value::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            JsonValue::Object(_) => Err(EscapeError::UnsupportedType("object".to_string())),
        }
    }
}
