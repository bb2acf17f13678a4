use std::cell::Cell;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::convert::FromRowValue;
use crate::error::SqlAccessError;
use crate::types::RowValues;

/// A row materialized as label → value, with NULL columns left out.
pub type RowMap = HashMap<String, RowValues>;

/// The current row of a [`RowCursor`](super::RowCursor).
///
/// Columns are addressed by 1-based ordinal or by label. Typed reads coerce the stored value and
/// remember whether it was NULL, which [`Row::was_null`] reports afterwards.
#[derive(Debug, Clone)]
pub struct Row {
    /// The column names for this row (shared across all rows in a result set)
    column_names: Arc<Vec<String>>,
    values: Vec<RowValues>,
    // label -> 0-based index, built once per result set
    column_index_cache: Arc<HashMap<String, usize>>,
    last_was_null: Cell<bool>,
}

impl Row {
    /// Create a row from shared column names and its values.
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<RowValues>) -> Self {
        let cache = Arc::new(index_columns(&column_names));
        Self::with_cache(column_names, cache, values)
    }

    pub(crate) fn with_cache(
        column_names: Arc<Vec<String>>,
        column_index_cache: Arc<HashMap<String, usize>>,
        values: Vec<RowValues>,
    ) -> Self {
        Self {
            column_names,
            values,
            column_index_cache,
            last_was_null: Cell::new(false),
        }
    }

    pub(crate) fn replace_values(&mut self, values: Vec<RowValues>) {
        self.values = values;
        self.last_was_null.set(false);
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.column_names.len()
    }

    /// 1-based ordinal of a column label.
    ///
    /// # Errors
    /// Returns [`SqlAccessError::ColumnNotFound`] if no column carries that label.
    pub fn find_column(&self, label: &str) -> Result<usize, SqlAccessError> {
        self.column_index_cache
            .get(label)
            .copied()
            .or_else(|| {
                self.column_names
                    .iter()
                    .position(|name| name.eq_ignore_ascii_case(label))
            })
            .map(|idx| idx + 1)
            .ok_or_else(|| SqlAccessError::ColumnNotFound(label.to_string()))
    }

    /// Read a column as `T`.
    ///
    /// NULL becomes `None` for `Option<T>`, zero/false for numeric and boolean targets, and a
    /// [`SqlAccessError::TypeMismatch`] for everything else.
    ///
    /// # Errors
    /// Returns [`SqlAccessError::ColumnNotFound`] for an unknown column and
    /// [`SqlAccessError::TypeMismatch`] when the value cannot be coerced.
    pub fn get<T: FromRowValue>(&self, column: impl ColumnIndex) -> Result<T, SqlAccessError> {
        let ordinal = column.ordinal(self)?;
        let value = self.value_at(ordinal)?;
        self.last_was_null.set(value.is_null());
        let converted = if value.is_null() {
            T::from_null()
        } else {
            T::from_row_value(value)
        };
        converted.ok_or_else(|| SqlAccessError::TypeMismatch {
            column: self.label_of(ordinal),
            expected: T::EXPECTED,
            found: value.type_name(),
        })
    }

    /// Read the first column, for queries known to project exactly one.
    ///
    /// # Errors
    /// See [`Row::get`].
    pub fn first<T: FromRowValue>(&self) -> Result<T, SqlAccessError> {
        self.get(1)
    }

    /// Whether the column read most recently held NULL.
    #[must_use]
    pub fn was_null(&self) -> bool {
        self.last_was_null.get()
    }

    /// The row as label → value, leaving out NULL columns entirely.
    ///
    /// # Errors
    /// Returns [`SqlAccessError::ColumnNotFound`] if the row carries fewer values than labels.
    pub fn map(&self) -> Result<RowMap, SqlAccessError> {
        let mut map = RowMap::with_capacity(self.values.len());
        for (idx, label) in self.column_names.iter().enumerate() {
            let value = self.value_at(idx + 1)?;
            self.last_was_null.set(value.is_null());
            if value.is_null() {
                continue;
            }
            map.insert(label.clone(), value.clone());
        }
        Ok(map)
    }

    fn value_at(&self, ordinal: usize) -> Result<&RowValues, SqlAccessError> {
        ordinal
            .checked_sub(1)
            .and_then(|idx| self.values.get(idx))
            .ok_or_else(|| SqlAccessError::ColumnNotFound(format!("#{ordinal}")))
    }

    fn label_of(&self, ordinal: usize) -> String {
        self.column_names
            .get(ordinal - 1)
            .cloned()
            .unwrap_or_else(|| format!("#{ordinal}"))
    }
}

macro_rules! typed_accessors {
    ($($get:ident, $first:ident => $ty:ty;)*) => {
        impl Row {
            $(
                #[doc = concat!("Read a column as `", stringify!($ty), "`. See [`Row::get`].")]
                ///
                /// # Errors
                /// See [`Row::get`].
                pub fn $get(&self, column: impl ColumnIndex) -> Result<$ty, SqlAccessError> {
                    self.get(column)
                }

                #[doc = concat!("Read the first column as `", stringify!($ty), "`.")]
                ///
                /// # Errors
                /// See [`Row::get`].
                pub fn $first(&self) -> Result<$ty, SqlAccessError> {
                    self.first()
                }
            )*
        }
    };
}

typed_accessors! {
    get_string, first_string => Option<String>;
    get_uuid, first_uuid => Option<Uuid>;
    get_short, first_short => i16;
    get_int, first_int => i32;
    get_long, first_long => i64;
    get_double, first_double => f64;
    get_decimal, first_decimal => Option<Decimal>;
    get_bool, first_bool => bool;
    get_date, first_date => Option<NaiveDate>;
    get_date_time, first_date_time => Option<NaiveDateTime>;
}

/// Ways of naming a column: a 1-based ordinal or a label.
pub trait ColumnIndex {
    /// Resolve to a 1-based ordinal.
    ///
    /// # Errors
    /// Returns [`SqlAccessError::ColumnNotFound`] if the column does not exist.
    fn ordinal(&self, row: &Row) -> Result<usize, SqlAccessError>;
}

impl ColumnIndex for usize {
    fn ordinal(&self, row: &Row) -> Result<usize, SqlAccessError> {
        if *self == 0 || *self > row.column_count() {
            return Err(SqlAccessError::ColumnNotFound(format!("#{self}")));
        }
        Ok(*self)
    }
}

impl ColumnIndex for &str {
    fn ordinal(&self, row: &Row) -> Result<usize, SqlAccessError> {
        row.find_column(self)
    }
}

impl ColumnIndex for &String {
    fn ordinal(&self, row: &Row) -> Result<usize, SqlAccessError> {
        row.find_column(self)
    }
}

/// Label -> 0-based index. A repeated label resolves to its first column.
pub(crate) fn index_columns(column_names: &[String]) -> HashMap<String, usize> {
    let mut index = HashMap::with_capacity(column_names.len());
    for (i, name) in column_names.iter().enumerate() {
        index.entry(name.clone()).or_insert(i);
    }
    index
}
