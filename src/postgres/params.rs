use std::error::Error;

use bytes::BytesMut;
use postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use rust_decimal::Decimal;

use crate::types::RowValues;

type BoxError = Box<dyn Error + Sync + Send>;

/// Integers follow the width the server inferred for the placeholder, so `set_int` can feed a
/// `BIGINT` column and `LIMIT ?` alike.
fn integer_to_sql(value: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(value)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(value)?.to_sql(ty, out),
        Type::INT8 => value.to_sql(ty, out),
        Type::OID => u32::try_from(value)?.to_sql(ty, out),
        Type::NUMERIC => Decimal::from(value).to_sql(ty, out),
        _ => value.to_sql_checked(ty, out),
    }
}

fn float_to_sql(value: f64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        #[allow(clippy::cast_possible_truncation)]
        Type::FLOAT4 => (value as f32).to_sql(ty, out),
        Type::NUMERIC => Decimal::try_from(value)?.to_sql(ty, out),
        _ => value.to_sql_checked(ty, out),
    }
}

impl ToSql for RowValues {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            RowValues::Short(v) => integer_to_sql(i64::from(*v), ty, out),
            RowValues::Int(v) => integer_to_sql(i64::from(*v), ty, out),
            RowValues::Long(v) => integer_to_sql(*v, ty, out),
            RowValues::Float(v) => float_to_sql(*v, ty, out),
            RowValues::Decimal(d) if *ty == Type::FLOAT8 => f64::try_from(*d)?.to_sql(ty, out),
            RowValues::Decimal(d) => d.to_sql_checked(ty, out),
            RowValues::Text(s) => s.to_sql_checked(ty, out),
            RowValues::Bool(b) => b.to_sql_checked(ty, out),
            RowValues::Uuid(u) => u.to_sql_checked(ty, out),
            RowValues::Date(d) => d.to_sql_checked(ty, out),
            RowValues::Timestamp(ts) if *ty == Type::TIMESTAMPTZ => ts.and_utc().to_sql(ty, out),
            RowValues::Timestamp(ts) => ts.to_sql_checked(ty, out),
            RowValues::JSON(v) => v.to_sql_checked(ty, out),
            RowValues::Blob(b) => b.to_sql_checked(ty, out),
            RowValues::Null => Ok(IsNull::Yes),
        }
    }

    // Each variant checks the concrete type itself.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}
