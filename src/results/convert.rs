use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::types::RowValues;

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Types a column value can be read as.
///
/// `from_row_value` is only called for non-NULL values; `from_null` decides what NULL becomes.
/// Returning `None` from either turns into [`SqlAccessError::TypeMismatch`](crate::error::SqlAccessError::TypeMismatch).
pub trait FromRowValue: Sized {
    /// Name reported in type mismatch errors.
    const EXPECTED: &'static str;

    fn from_row_value(value: &RowValues) -> Option<Self>;

    fn from_null() -> Option<Self> {
        None
    }
}

impl<T: FromRowValue> FromRowValue for Option<T> {
    const EXPECTED: &'static str = T::EXPECTED;

    fn from_row_value(value: &RowValues) -> Option<Self> {
        T::from_row_value(value).map(Some)
    }

    fn from_null() -> Option<Self> {
        Some(None)
    }
}

macro_rules! impl_integer {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl FromRowValue for $ty {
                const EXPECTED: &'static str = $name;

                fn from_row_value(value: &RowValues) -> Option<Self> {
                    match value {
                        RowValues::Bool(b) => Some(<$ty>::from(*b)),
                        RowValues::Text(text) => text.trim().parse().ok(),
                        RowValues::Decimal(d) if d.fract().is_zero() => d.to_i64().and_then(|v| <$ty>::try_from(v).ok()),
                        other => other.as_long().and_then(|v| <$ty>::try_from(v).ok()),
                    }
                }

                fn from_null() -> Option<Self> {
                    Some(0)
                }
            }
        )*
    };
}

impl_integer! {
    i16 => "smallint",
    i32 => "integer",
    i64 => "bigint",
}

impl FromRowValue for f64 {
    const EXPECTED: &'static str = "double";

    fn from_row_value(value: &RowValues) -> Option<Self> {
        match value {
            RowValues::Float(v) => Some(*v),
            RowValues::Decimal(d) => d.to_f64(),
            RowValues::Text(text) => text.trim().parse().ok(),
            #[allow(clippy::cast_precision_loss)]
            other => other.as_long().map(|v| v as f64),
        }
    }

    fn from_null() -> Option<Self> {
        Some(0.0)
    }
}

impl FromRowValue for bool {
    const EXPECTED: &'static str = "boolean";

    fn from_row_value(value: &RowValues) -> Option<Self> {
        match value {
            RowValues::Text(text) => match text.trim() {
                "1" | "t" | "true" | "TRUE" => Some(true),
                "0" | "f" | "false" | "FALSE" => Some(false),
                _ => None,
            },
            other => other.as_bool(),
        }
    }

    fn from_null() -> Option<Self> {
        Some(false)
    }
}

impl FromRowValue for Decimal {
    const EXPECTED: &'static str = "decimal";

    fn from_row_value(value: &RowValues) -> Option<Self> {
        match value {
            RowValues::Decimal(d) => Some(*d),
            RowValues::Float(v) => Decimal::try_from(*v).ok(),
            RowValues::Text(text) => Decimal::from_str(text.trim()).ok(),
            other => other.as_long().map(Decimal::from),
        }
    }
}

impl FromRowValue for String {
    const EXPECTED: &'static str = "text";

    fn from_row_value(value: &RowValues) -> Option<Self> {
        Some(match value {
            RowValues::Text(text) => text.clone(),
            RowValues::Short(v) => v.to_string(),
            RowValues::Int(v) => v.to_string(),
            RowValues::Long(v) => v.to_string(),
            RowValues::Float(v) => v.to_string(),
            RowValues::Decimal(v) => v.to_string(),
            RowValues::Bool(v) => v.to_string(),
            RowValues::Uuid(v) => v.to_string(),
            RowValues::Date(v) => v.to_string(),
            RowValues::Timestamp(v) => v.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
            RowValues::JSON(v) => v.to_string(),
            RowValues::Blob(bytes) => return String::from_utf8(bytes.clone()).ok(),
            RowValues::Null => return None,
        })
    }
}

impl FromRowValue for Uuid {
    const EXPECTED: &'static str = "uuid";

    fn from_row_value(value: &RowValues) -> Option<Self> {
        match value {
            RowValues::Uuid(v) => Some(*v),
            RowValues::Text(text) => Uuid::parse_str(text.trim()).ok(),
            RowValues::Blob(bytes) => Uuid::from_slice(bytes).ok(),
            _ => None,
        }
    }
}

impl FromRowValue for NaiveDate {
    const EXPECTED: &'static str = "date";

    fn from_row_value(value: &RowValues) -> Option<Self> {
        match value {
            RowValues::Date(v) => Some(*v),
            RowValues::Timestamp(v) => Some(v.date()),
            RowValues::Text(text) => {
                let text = text.trim();
                NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .ok()
                    .or_else(|| parse_timestamp(text).map(|ts| ts.date()))
            }
            _ => None,
        }
    }
}

impl FromRowValue for NaiveDateTime {
    const EXPECTED: &'static str = "timestamp";

    fn from_row_value(value: &RowValues) -> Option<Self> {
        match value {
            RowValues::Timestamp(v) => Some(*v),
            RowValues::Date(v) => v.and_hms_opt(0, 0, 0),
            RowValues::Text(text) => parse_timestamp(text.trim()),
            _ => None,
        }
    }
}

impl FromRowValue for JsonValue {
    const EXPECTED: &'static str = "json";

    fn from_row_value(value: &RowValues) -> Option<Self> {
        match value {
            RowValues::JSON(v) => Some(v.clone()),
            RowValues::Text(text) => serde_json::from_str(text).ok(),
            _ => None,
        }
    }
}

impl FromRowValue for Vec<u8> {
    const EXPECTED: &'static str = "blob";

    fn from_row_value(value: &RowValues) -> Option<Self> {
        match value {
            RowValues::Blob(bytes) => Some(bytes.clone()),
            RowValues::Text(text) => Some(text.clone().into_bytes()),
            _ => None,
        }
    }
}

impl FromRowValue for RowValues {
    const EXPECTED: &'static str = "any";

    fn from_row_value(value: &RowValues) -> Option<Self> {
        Some(value.clone())
    }

    fn from_null() -> Option<Self> {
        Some(RowValues::Null)
    }
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_are_range_checked() {
        assert_eq!(i16::from_row_value(&RowValues::Long(12)), Some(12));
        assert_eq!(i16::from_row_value(&RowValues::Long(i64::from(i16::MAX) + 1)), None);
        assert_eq!(i32::from_row_value(&RowValues::Text(" 42 ".into())), Some(42));
        assert_eq!(i64::from_row_value(&RowValues::Bool(true)), Some(1));
    }

    #[test]
    fn sqlite_text_storage_is_parsed() {
        let id = Uuid::from_u128(0x1234);
        assert_eq!(Uuid::from_row_value(&RowValues::Text(id.to_string())), Some(id));
        assert_eq!(Uuid::from_row_value(&RowValues::Blob(id.as_bytes().to_vec())), Some(id));

        let ts = NaiveDateTime::from_row_value(&RowValues::Text("2024-03-01 10:11:12.5".into()));
        assert_eq!(ts.map(|t| t.to_string()), Some("2024-03-01 10:11:12.500".to_string()));
        let date = NaiveDate::from_row_value(&RowValues::Text("2024-03-01T00:00:00".into()));
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 1));

        assert_eq!(
            Decimal::from_row_value(&RowValues::Text("12.50".into())),
            Some(Decimal::new(1250, 2))
        );
    }

    #[test]
    fn null_defaults_follow_target_type() {
        assert_eq!(i32::from_null(), Some(0));
        assert_eq!(bool::from_null(), Some(false));
        assert_eq!(<Option<String>>::from_null(), Some(None));
        assert_eq!(String::from_null(), None);
        assert_eq!(Uuid::from_null(), None);
    }

    #[test]
    fn booleans_accept_only_zero_and_one() {
        assert_eq!(bool::from_row_value(&RowValues::Long(1)), Some(true));
        assert_eq!(bool::from_row_value(&RowValues::Long(0)), Some(false));
        assert_eq!(bool::from_row_value(&RowValues::Long(3)), None);
    }
}
