use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use postgres::fallible_iterator::FallibleIterator;
use postgres::types::{ToSql, Type};
use postgres::{Client, RowIter, Statement};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::driver::{PreparedHandle, ResultStream};
use crate::error::DriverError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// A server-side prepared statement with its parameters collected client-side.
///
/// Values are encoded when the statement runs, against the parameter types the server inferred
/// during `prepare`.
pub struct PostgresPrepared<'c> {
    client: &'c mut Client,
    statement: Statement,
    params: Vec<RowValues>,
    returning: bool,
    keys: Option<ResultSet>,
}

impl<'c> PostgresPrepared<'c> {
    pub(super) fn new(client: &'c mut Client, statement: Statement, returning: bool) -> Self {
        let params = vec![RowValues::Null; statement.params().len()];
        Self {
            client,
            statement,
            params,
            returning,
            keys: None,
        }
    }

    fn column_names(&self) -> Arc<Vec<String>> {
        Arc::new(
            self.statement
                .columns()
                .iter()
                .map(|col| col.name().to_string())
                .collect(),
        )
    }

    fn rows(&mut self) -> Result<PostgresRows<'_>, DriverError> {
        let column_names = self.column_names();
        let types = self
            .statement
            .columns()
            .iter()
            .map(|col| col.type_().clone())
            .collect();
        let rows = self.client.query_raw(&self.statement, self.params.iter())?;
        Ok(PostgresRows {
            rows,
            column_names,
            types,
        })
    }
}

impl PreparedHandle for PostgresPrepared<'_> {
    fn bind(&mut self, position: usize, value: RowValues) -> Result<(), DriverError> {
        let slot = position
            .checked_sub(1)
            .and_then(|idx| self.params.get_mut(idx))
            .ok_or_else(|| {
                DriverError::new(format!(
                    "parameter index {position} is out of range (statement takes {})",
                    self.statement.params().len()
                ))
            })?;
        *slot = value;
        Ok(())
    }

    fn execute_query(&mut self) -> Result<Box<dyn ResultStream + '_>, DriverError> {
        Ok(Box::new(self.rows()?))
    }

    fn execute_update(&mut self) -> Result<u64, DriverError> {
        if !self.returning {
            let refs: Vec<&(dyn ToSql + Sync)> = self
                .params
                .iter()
                .map(|p| p as &(dyn ToSql + Sync))
                .collect();
            return Ok(self.client.execute(&self.statement, &refs)?);
        }
        let mut rows = self.rows()?;
        let keys = ResultSet::collect_from(&mut rows)?;
        drop(rows);
        let affected = u64::try_from(keys.len()).unwrap_or(u64::MAX);
        self.keys = Some(keys);
        Ok(affected)
    }

    fn execute(&mut self) -> Result<(), DriverError> {
        let mut rows = self.rows()?;
        while rows.rows.next()?.is_some() {}
        Ok(())
    }

    fn generated_keys(&mut self) -> Result<Box<dyn ResultStream + '_>, DriverError> {
        Ok(Box::new(self.keys.take().unwrap_or_default()))
    }
}

/// Rows streamed from the server for one portal.
pub struct PostgresRows<'c> {
    rows: RowIter<'c>,
    column_names: Arc<Vec<String>>,
    types: Vec<Type>,
}

impl ResultStream for PostgresRows<'_> {
    fn column_names(&self) -> Arc<Vec<String>> {
        Arc::clone(&self.column_names)
    }

    fn next_row(&mut self) -> Result<Option<Vec<RowValues>>, DriverError> {
        let Some(row) = self.rows.next()? else {
            return Ok(None);
        };
        let mut values = Vec::with_capacity(self.types.len());
        for (idx, ty) in self.types.iter().enumerate() {
            values.push(extract_value(&row, idx, ty)?);
        }
        Ok(Some(values))
    }
}

/// Read column `idx` of `row` as the [`RowValues`] variant matching its server type.
///
/// Types without a dedicated variant are read as text; the driver reports an error when the
/// column cannot be decoded that way.
fn extract_value(row: &postgres::Row, idx: usize, ty: &Type) -> Result<RowValues, postgres::Error> {
    fn get<'r, T: postgres::types::FromSql<'r>>(
        row: &'r postgres::Row,
        idx: usize,
        wrap: impl FnOnce(T) -> RowValues,
    ) -> Result<RowValues, postgres::Error> {
        let value: Option<T> = row.try_get(idx)?;
        Ok(value.map_or(RowValues::Null, wrap))
    }

    match *ty {
        Type::CHAR => get(row, idx, |v: i8| RowValues::Short(i16::from(v))),
        Type::INT2 => get(row, idx, RowValues::Short),
        Type::INT4 => get(row, idx, RowValues::Int),
        Type::INT8 => get(row, idx, RowValues::Long),
        Type::OID => get(row, idx, |v: u32| RowValues::Long(i64::from(v))),
        Type::FLOAT4 => get(row, idx, |v: f32| RowValues::Float(f64::from(v))),
        Type::FLOAT8 => get(row, idx, RowValues::Float),
        Type::NUMERIC => get::<Decimal>(row, idx, RowValues::Decimal),
        Type::BOOL => get(row, idx, RowValues::Bool),
        Type::UUID => get::<Uuid>(row, idx, RowValues::Uuid),
        Type::DATE => get::<NaiveDate>(row, idx, RowValues::Date),
        Type::TIMESTAMP => get::<NaiveDateTime>(row, idx, RowValues::Timestamp),
        Type::TIMESTAMPTZ => get(row, idx, |v: DateTime<Utc>| RowValues::Timestamp(v.naive_utc())),
        Type::JSON | Type::JSONB => get::<JsonValue>(row, idx, RowValues::JSON),
        Type::BYTEA => get::<Vec<u8>>(row, idx, RowValues::Blob),
        _ => get::<String>(row, idx, RowValues::Text),
    }
}
