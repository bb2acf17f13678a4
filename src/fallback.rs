use std::collections::HashMap;
use std::fmt;

use crate::error::SqlAccessError;
use crate::results::Row;
use crate::statement::Statement;
use crate::types::RowValues;

/// Column name → value of the row a write collided with. Empty when nothing was recovered.
pub type ViolationSet = HashMap<String, RowValues>;

/// A read run after a write fails, to explain the failure.
///
/// It runs on the connection that reported the failure (so it sees the same transaction) and
/// only its first row is used.
pub struct FallbackQuery<'a, T> {
    statement: Statement<'a>,
    converter: Box<dyn Fn(&Row) -> Result<T, SqlAccessError> + 'a>,
}

/// Fallback for unique violations: projects the conflicting columns of the existing row.
pub type UniqueViolationQuery<'a> = FallbackQuery<'a, ViolationSet>;

impl<'a, T> FallbackQuery<'a, T> {
    pub fn new<F>(statement: Statement<'a>, converter: F) -> Self
    where
        F: Fn(&Row) -> Result<T, SqlAccessError> + 'a,
    {
        Self {
            statement,
            converter: Box::new(converter),
        }
    }

    #[must_use]
    pub fn statement(&self) -> &Statement<'a> {
        &self.statement
    }

    pub(crate) fn convert(&self, row: &Row) -> Result<T, SqlAccessError> {
        (self.converter)(row)
    }
}

impl<'a> FallbackQuery<'a, ViolationSet> {
    /// Every non-NULL column the statement projects becomes a violation entry.
    ///
    /// ```rust
    /// # use sql_access::prelude::*;
    /// let title = "Alpha";
    /// let fallback = UniqueViolationQuery::projecting(Statement::with_params(
    ///     "SELECT title FROM book WHERE title = ?",
    ///     [title],
    /// ));
    /// # let _ = fallback;
    /// ```
    #[must_use]
    pub fn projecting(statement: Statement<'a>) -> Self {
        Self::new(statement, Row::map)
    }
}

impl<T> fmt::Debug for FallbackQuery<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackQuery")
            .field("statement", &self.statement)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::statement::SqlStatement;

    #[test]
    fn projecting_maps_non_null_columns() {
        let fallback = UniqueViolationQuery::projecting(Statement::with_params(
            "SELECT title, publisher FROM book WHERE title = ?",
            ["Alpha"],
        ));
        let row = Row::new(
            Arc::new(vec!["title".into(), "publisher".into()]),
            vec![RowValues::Text("Alpha".into()), RowValues::Null],
        );
        let violations = fallback.convert(&row).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations["title"], RowValues::Text("Alpha".into()));
        assert_eq!(
            fallback.statement().sql(),
            "SELECT title, publisher FROM book WHERE title = ?"
        );
    }
}
