//! Field value types for target-schema records.
//!
//! Source snapshots carry every column as text. The transformer coerces the
//! handful of typed columns (counts, timestamps, measurements) and leaves the
//! rest as text for the target database to convert.

use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};

/// Canonical textual timestamp format of the target database.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single value in a target-schema record.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Explicit NULL.
    Null,

    /// Text as read from the source.
    Text(String),

    /// Integer (counts, identifiers).
    Int(i64),

    /// Floating point (normalized measurements).
    Float(f64),

    /// Timestamp without timezone, serialized in [`TIMESTAMP_FORMAT`].
    DateTime(NaiveDateTime),
}

impl FieldValue {
    /// Empty text value used to initialize record templates.
    #[must_use]
    pub fn empty() -> Self {
        FieldValue::Text(String::new())
    }

    /// True for NULL and for empty text: the value carries nothing.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Borrow the text of a `Text` value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Replace empty text with NULL.
    #[must_use]
    pub fn null_if_empty(self) -> Self {
        match self {
            FieldValue::Text(s) if s.is_empty() => FieldValue::Null,
            other => other,
        }
    }

    /// Render the value as a SQL parameter string, `None` for NULL.
    #[must_use]
    pub fn to_param_string(&self) -> Option<String> {
        match self {
            FieldValue::Null => None,
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::Int(i) => Some(i.to_string()),
            FieldValue::Float(f) => Some(f.to_string()),
            FieldValue::DateTime(dt) => Some(dt.format(TIMESTAMP_FORMAT).to_string()),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Null => serializer.serialize_none(),
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::Int(i) => serializer.serialize_i64(*i),
            FieldValue::Float(f) => serializer.serialize_f64(*f),
            FieldValue::DateTime(dt) => {
                serializer.collect_str(&dt.format(TIMESTAMP_FORMAT))
            }
        }
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(v: NaiveDateTime) -> Self {
        FieldValue::DateTime(v)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(FieldValue::Null)
    }
}
