//! Narrow interfaces to the environment: pools, connections, prepared statements, result streams.
//!
//! The executor only ever talks to a database through these traits. The `sqlite` and `postgres`
//! modules implement them for `rusqlite` and the synchronous `postgres` client, and any
//! `r2d2::Pool` whose connections implement [`Connection`] is a [`ConnectionSource`].

use std::ops::DerefMut;
use std::sync::Arc;

use crate::error::DriverError;
use crate::types::RowValues;

/// Hands out exclusively owned connections for the duration of one operation.
///
/// The guard releases the connection when dropped; the executor never keeps one past the call
/// that acquired it.
pub trait ConnectionSource {
    type Connection: Connection;
    type Guard<'s>: DerefMut<Target = Self::Connection>
    where
        Self: 's;

    /// Check a connection out of the pool.
    ///
    /// # Errors
    /// Returns [`DriverError`] when no connection can be obtained.
    fn acquire(&self) -> Result<Self::Guard<'_>, DriverError>;
}

/// A live database session able to prepare statements and demarcate transactions.
pub trait Connection {
    type Prepared<'c>: PreparedHandle
    where
        Self: 'c;

    /// Prepare `text`. When `returning` names columns, the statement must make their values for
    /// the written rows available through [`PreparedHandle::generated_keys`].
    ///
    /// # Errors
    /// Returns [`DriverError`] when the server rejects the statement.
    fn prepare<'c>(
        &'c mut self,
        text: &str,
        returning: Option<&[&str]>,
    ) -> Result<Self::Prepared<'c>, DriverError>;

    /// # Errors
    /// Returns [`DriverError`] if the transaction cannot be opened.
    fn begin(&mut self) -> Result<(), DriverError>;

    /// # Errors
    /// Returns [`DriverError`] if the commit fails.
    fn commit(&mut self) -> Result<(), DriverError>;

    /// # Errors
    /// Returns [`DriverError`] if the rollback fails.
    fn rollback(&mut self) -> Result<(), DriverError>;

    /// Mark a point inside the open transaction that a failed statement can be undone to.
    ///
    /// # Errors
    /// Returns [`DriverError`] if the savepoint cannot be created.
    fn savepoint(&mut self, name: &str) -> Result<(), DriverError>;

    /// # Errors
    /// Returns [`DriverError`] if the savepoint is unknown.
    fn release_savepoint(&mut self, name: &str) -> Result<(), DriverError>;

    /// Undo everything after the savepoint, leaving the transaction usable again.
    ///
    /// # Errors
    /// Returns [`DriverError`] if the savepoint is unknown.
    fn rollback_to_savepoint(&mut self, name: &str) -> Result<(), DriverError>;
}

/// A prepared statement addressed by 1-based parameter positions.
pub trait PreparedHandle {
    /// Assign `value` to the parameter at `position` (1-based).
    ///
    /// # Errors
    /// Returns [`DriverError`] if the driver refuses the value or the position.
    fn bind(&mut self, position: usize, value: RowValues) -> Result<(), DriverError>;

    /// # Errors
    /// Returns [`DriverError`] if execution fails.
    fn execute_query(&mut self) -> Result<Box<dyn ResultStream + '_>, DriverError>;

    /// Run a write and report the affected row count.
    ///
    /// # Errors
    /// Returns [`DriverError`] if execution fails.
    fn execute_update(&mut self) -> Result<u64, DriverError>;

    /// Run the statement and discard whatever it produces.
    ///
    /// # Errors
    /// Returns [`DriverError`] if execution fails.
    fn execute(&mut self) -> Result<(), DriverError>;

    /// Rows holding the `returning` columns produced by the last [`execute_update`](Self::execute_update).
    ///
    /// # Errors
    /// Returns [`DriverError`] if the keys cannot be read.
    fn generated_keys(&mut self) -> Result<Box<dyn ResultStream + '_>, DriverError>;
}

/// A forward-only stream of result rows.
pub trait ResultStream {
    /// Column labels in projection order, shared by every row.
    fn column_names(&self) -> Arc<Vec<String>>;

    /// Values of the next row, or `None` once the stream is exhausted.
    ///
    /// # Errors
    /// Returns [`DriverError`] if fetching the row fails.
    fn next_row(&mut self) -> Result<Option<Vec<RowValues>>, DriverError>;
}

#[cfg(any(feature = "sqlite", feature = "postgres"))]
impl<M> ConnectionSource for r2d2::Pool<M>
where
    M: r2d2::ManageConnection,
    M::Connection: Connection,
{
    type Connection = M::Connection;
    type Guard<'s>
        = r2d2::PooledConnection<M>
    where
        Self: 's;

    fn acquire(&self) -> Result<Self::Guard<'_>, DriverError> {
        Ok(self.get()?)
    }
}
