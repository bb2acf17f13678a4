use std::sync::Arc;

use rusqlite::CachedStatement;

use super::params::{from_sqlite_value, to_sqlite_value};
use crate::driver::{PreparedHandle, ResultStream};
use crate::error::DriverError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// A cached `rusqlite` statement.
///
/// Writes that ask for returned columns are prepared with a `RETURNING` clause; their rows are
/// drained into memory by `execute_update` and handed out by `generated_keys`.
pub struct SqlitePrepared<'c> {
    stmt: CachedStatement<'c>,
    returning: bool,
    keys: Option<ResultSet>,
}

impl<'c> SqlitePrepared<'c> {
    pub(super) fn new(stmt: CachedStatement<'c>, returning: bool) -> Self {
        Self {
            stmt,
            returning,
            keys: None,
        }
    }

    fn column_names(&self) -> Arc<Vec<String>> {
        Arc::new(
            self.stmt
                .column_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
        )
    }
}

impl PreparedHandle for SqlitePrepared<'_> {
    fn bind(&mut self, position: usize, value: RowValues) -> Result<(), DriverError> {
        self.stmt.raw_bind_parameter(position, to_sqlite_value(value))?;
        Ok(())
    }

    fn execute_query(&mut self) -> Result<Box<dyn ResultStream + '_>, DriverError> {
        let column_names = self.column_names();
        Ok(Box::new(SqliteRows {
            rows: self.stmt.raw_query(),
            column_names,
        }))
    }

    fn execute_update(&mut self) -> Result<u64, DriverError> {
        if !self.returning {
            let affected = self.stmt.raw_execute()?;
            return Ok(u64::try_from(affected).unwrap_or(u64::MAX));
        }
        let mut rows = SqliteRows {
            column_names: self.column_names(),
            rows: self.stmt.raw_query(),
        };
        let keys = ResultSet::collect_from(&mut rows)?;
        drop(rows);
        let affected = u64::try_from(keys.len()).unwrap_or(u64::MAX);
        self.keys = Some(keys);
        Ok(affected)
    }

    fn execute(&mut self) -> Result<(), DriverError> {
        let mut rows = self.stmt.raw_query();
        while rows.next()?.is_some() {}
        Ok(())
    }

    fn generated_keys(&mut self) -> Result<Box<dyn ResultStream + '_>, DriverError> {
        Ok(Box::new(self.keys.take().unwrap_or_default()))
    }
}

/// Live rows of a stepping `rusqlite` statement.
pub struct SqliteRows<'s> {
    rows: rusqlite::Rows<'s>,
    column_names: Arc<Vec<String>>,
}

impl ResultStream for SqliteRows<'_> {
    fn column_names(&self) -> Arc<Vec<String>> {
        Arc::clone(&self.column_names)
    }

    fn next_row(&mut self) -> Result<Option<Vec<RowValues>>, DriverError> {
        let width = self.column_names.len();
        let Some(row) = self.rows.next()? else {
            return Ok(None);
        };
        let mut values = Vec::with_capacity(width);
        for idx in 0..width {
            values.push(from_sqlite_value(row.get(idx)?));
        }
        Ok(Some(values))
    }
}
