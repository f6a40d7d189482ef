//! Column values of patient records.

use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};
use std::fmt;

/// Format used for date-time values on the wire and in exports.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Type family of a result column, as reported by the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Character and everything not listed below, read as text.
    Text,
    /// NUMBER, FLOAT, BINARY_FLOAT, BINARY_DOUBLE.
    Number,
    /// DATE and TIMESTAMP variants.
    Date,
}

/// A single column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL value.
    Null,
    /// String value (VARCHAR2, CHAR, etc.).
    Text(String),
    /// Number value as string (preserves precision).
    Number(String),
    /// Date/time value (DATE type).
    Date(NaiveDateTime),
}

impl Value {
    /// Check if the value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get the value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Number(s) => Some(s),
            _ => None,
        }
    }

    /// Try to convert to i64.
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Value::Number(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Try to get the value as a NaiveDateTime.
    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Date(dt) => Some(*dt),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.to_string())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::Date(dt)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Text(s) => write!(f, "{}", s),
            Value::Number(n) => write!(f, "{}", n),
            Value::Date(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),
        }
    }
}

enum ExactNumber {
    Int(i64),
    UInt(u64),
    Float(f64),
}

/// Numeric form of `text` if it prints back to exactly `text`.
///
/// Decimal text beyond `f64` precision has no exact form and stays a string.
fn exact_number(text: &str) -> Option<ExactNumber> {
    if let Ok(i) = text.parse::<i64>() {
        return (i.to_string() == text).then_some(ExactNumber::Int(i));
    }
    if let Ok(u) = text.parse::<u64>() {
        return (u.to_string() == text).then_some(ExactNumber::UInt(u));
    }
    match text.parse::<f64>() {
        Ok(f) if f.is_finite() && f.to_string() == text => Some(ExactNumber::Float(f)),
        _ => None,
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Number(n) => match exact_number(n) {
                Some(ExactNumber::Int(i)) => serializer.serialize_i64(i),
                Some(ExactNumber::UInt(u)) => serializer.serialize_u64(u),
                Some(ExactNumber::Float(f)) => serializer.serialize_f64(f),
                None => serializer.serialize_str(n),
            },
            Value::Date(dt) => serializer.collect_str(&dt.format(DATETIME_FORMAT)),
        }
    }
}
