use rusqlite::types::Value;

use crate::types::RowValues;

/// Convert a bound value to its SQLite storage form.
pub(super) fn to_sqlite_value(value: RowValues) -> Value {
    match value {
        RowValues::Short(v) => Value::Integer(i64::from(v)),
        RowValues::Int(v) => Value::Integer(i64::from(v)),
        RowValues::Long(v) => Value::Integer(v),
        RowValues::Float(v) => Value::Real(v),
        RowValues::Decimal(v) => Value::Text(v.to_string()),
        RowValues::Text(v) => Value::Text(v),
        RowValues::Bool(v) => Value::Integer(i64::from(v)),
        RowValues::Uuid(v) => Value::Text(v.hyphenated().to_string()),
        RowValues::Date(v) => Value::Text(v.format("%F").to_string()),
        RowValues::Timestamp(v) => Value::Text(v.format("%F %T%.f").to_string()),
        RowValues::JSON(v) => Value::Text(v.to_string()),
        RowValues::Blob(v) => Value::Blob(v),
        RowValues::Null => Value::Null,
    }
}

/// Convert a fetched SQLite value. Every integer comes back as `Long`.
pub(super) fn from_sqlite_value(value: Value) -> RowValues {
    match value {
        Value::Null => RowValues::Null,
        Value::Integer(v) => RowValues::Long(v),
        Value::Real(v) => RowValues::Float(v),
        Value::Text(v) => RowValues::Text(v),
        Value::Blob(v) => RowValues::Blob(v),
    }
}
