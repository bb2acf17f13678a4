use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Values that can be bound as statement parameters or read back from a row.
///
/// The same enum flows both ways so a violation set recovered from one backend can be compared
/// with the values that were bound on another:
/// ```rust
/// use sql_access::prelude::*;
///
/// let params = vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::Bool(true),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RowValues {
    /// 16-bit integer (`SMALLINT`)
    Short(i16),
    /// 32-bit integer (`INTEGER`)
    Int(i32),
    /// 64-bit integer (`BIGINT`, and every SQLite integer)
    Long(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Exact numeric (`NUMERIC` / `DECIMAL`)
    Decimal(Decimal),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// UUID value
    Uuid(Uuid),
    /// Calendar date without time zone
    Date(NaiveDate),
    /// Timestamp without time zone
    Timestamp(NaiveDateTime),
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
    /// NULL value
    Null,
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short SQL-ish name of the stored type, used in mismatch reports.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            RowValues::Short(_) => "smallint",
            RowValues::Int(_) => "integer",
            RowValues::Long(_) => "bigint",
            RowValues::Float(_) => "double",
            RowValues::Decimal(_) => "decimal",
            RowValues::Text(_) => "text",
            RowValues::Bool(_) => "boolean",
            RowValues::Uuid(_) => "uuid",
            RowValues::Date(_) => "date",
            RowValues::Timestamp(_) => "timestamp",
            RowValues::JSON(_) => "json",
            RowValues::Blob(_) => "blob",
            RowValues::Null => "NULL",
        }
    }

    /// Any integer variant widened to 64 bits.
    #[must_use]
    pub fn as_long(&self) -> Option<i64> {
        match self {
            RowValues::Short(v) => Some(i64::from(*v)),
            RowValues::Int(v) => Some(i64::from(*v)),
            RowValues::Long(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    /// Booleans, or the 0/1 integers SQLite stores them as.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        if let RowValues::Bool(value) = self {
            return Some(*value);
        }
        match self.as_long() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let RowValues::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }
}

macro_rules! impl_from_for_row_values {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$source> for RowValues {
                fn from(value: $source) -> Self {
                    RowValues::$variant(value)
                }
            }
        )*
    };
}

impl_from_for_row_values! {
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f64 => Float,
    Decimal => Decimal,
    String => Text,
    bool => Bool,
    Uuid => Uuid,
    NaiveDate => Date,
    NaiveDateTime => Timestamp,
    JsonValue => JSON,
    Vec<u8> => Blob,
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_owned())
    }
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}
