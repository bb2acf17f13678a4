use std::sync::Arc;

use super::row::{Row, index_columns};
use crate::driver::ResultStream;
use crate::error::DriverError;

/// Forward-only cursor over a query result.
///
/// Before the first successful [`advance`](RowCursor::advance) the current row is empty. The
/// underlying driver stream is released when the cursor is dropped.
pub struct RowCursor<'s> {
    stream: Box<dyn ResultStream + 's>,
    current: Row,
    exhausted: bool,
}

impl<'s> RowCursor<'s> {
    pub fn new(stream: Box<dyn ResultStream + 's>) -> Self {
        let column_names = stream.column_names();
        let cache = Arc::new(index_columns(&column_names));
        Self {
            stream,
            current: Row::with_cache(column_names, cache, Vec::new()),
            exhausted: false,
        }
    }

    /// Move to the next row. Returns `false` once the result is exhausted, and keeps returning
    /// `false` afterwards.
    ///
    /// # Errors
    /// Returns [`DriverError`] if the driver fails while fetching.
    pub fn advance(&mut self) -> Result<bool, DriverError> {
        if self.exhausted {
            return Ok(false);
        }
        match self.stream.next_row()? {
            Some(values) => {
                self.current.replace_values(values);
                Ok(true)
            }
            None => {
                self.exhausted = true;
                self.current.replace_values(Vec::new());
                Ok(false)
            }
        }
    }

    #[must_use]
    pub fn row(&self) -> &Row {
        &self.current
    }
}
