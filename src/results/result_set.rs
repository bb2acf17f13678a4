use std::collections::VecDeque;
use std::sync::Arc;

use crate::driver::ResultStream;
use crate::error::DriverError;
use crate::types::RowValues;

/// Rows buffered in memory, replayed as a [`ResultStream`].
///
/// Adapters use this for generated keys, which have to be drained from the driver before the
/// write call returns.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    rows: VecDeque<Vec<RowValues>>,
    /// Column names shared by all rows (to avoid duplicating in each row)
    column_names: Arc<Vec<String>>,
}

impl ResultSet {
    #[must_use]
    pub fn with_capacity(column_names: Arc<Vec<String>>, capacity: usize) -> ResultSet {
        ResultSet {
            rows: VecDeque::with_capacity(capacity),
            column_names,
        }
    }

    pub fn add_row_values(&mut self, row_values: Vec<RowValues>) {
        self.rows.push_back(row_values);
    }

    /// Rows not yet handed out.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Drain another stream into a buffer.
    ///
    /// # Errors
    /// Returns [`DriverError`] if fetching any row fails.
    pub fn collect_from(stream: &mut dyn ResultStream) -> Result<ResultSet, DriverError> {
        let mut set = ResultSet::with_capacity(stream.column_names(), 1);
        while let Some(values) = stream.next_row()? {
            set.add_row_values(values);
        }
        Ok(set)
    }
}

impl ResultStream for ResultSet {
    fn column_names(&self) -> Arc<Vec<String>> {
        Arc::clone(&self.column_names)
    }

    fn next_row(&mut self) -> Result<Option<Vec<RowValues>>, DriverError> {
        Ok(self.rows.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_rows_in_insertion_order() {
        let mut set = ResultSet::with_capacity(Arc::new(vec!["id".into()]), 2);
        set.add_row_values(vec![RowValues::Long(1)]);
        set.add_row_values(vec![RowValues::Long(2)]);

        let mut copy = ResultSet::collect_from(&mut set.clone()).unwrap();
        assert_eq!(copy.len(), 2);
        assert_eq!(copy.next_row().unwrap(), Some(vec![RowValues::Long(1)]));
        assert_eq!(copy.next_row().unwrap(), Some(vec![RowValues::Long(2)]));
        assert_eq!(copy.next_row().unwrap(), None);
        assert_eq!(copy.column_names().as_slice(), ["id".to_string()]);
    }
}
