//! Statement execution and transaction scoping.
//!
//! A [`Database`] owns the connection source and the diagnostics sink. Work goes through an
//! [`Executor`], which is either unbound (every call checks out its own connection) or bound to
//! one open transaction.
//!
//! ```rust,no_run
//! use sql_access::prelude::*;
//!
//! # fn demo() -> Result<(), SqlAccessError> {
//! let db = SqliteOptions::new("library.db").build()?;
//! let title = "Alpha";
//! let conflict = UniqueViolationQuery::projecting(Statement::with_params(
//!     "SELECT title FROM book WHERE title = ?",
//!     [title],
//! ));
//! db.with_transaction(|tx| {
//!     let insert = Statement::with_params("INSERT INTO book (title) VALUES (?)", [title]);
//!     tx.update_with_fallback(&insert, &conflict)?;
//!     Ok(())
//! })?;
//!
//! let count = db.select_first(&Statement::new("SELECT count(*) FROM book"), Row::first_long)?;
//! assert_eq!(count, Some(1));
//! # Ok(()) }
//! ```

use std::cell::{RefCell, RefMut};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use uuid::Uuid;

use crate::binder::ParameterBinder;
use crate::classify::{AccessPath, ErrorClassifier};
use crate::diagnostics::{DiagnosticsSink, Severity, TracingSink, emit, normalize_sql};
use crate::driver::{Connection, ConnectionSource, PreparedHandle};
use crate::error::{DriverError, SqlAccessError};
use crate::fallback::{UniqueViolationQuery, ViolationSet};
use crate::results::{FromRowValue, Row, RowCursor};
use crate::statement::{SqlStatement, Statement};

const FALLBACK_SAVEPOINT: &str = "sql_access_fallback";
const UUID_COLUMN: &str = "uuid";

/// Transaction demarcation of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    /// Runs inside the active transaction if there is one, without one otherwise.
    Supports,
    /// Joins the active transaction or starts one.
    Required,
    /// Always starts an independent transaction on a fresh connection.
    RequiresNew,
    /// Fails with [`SqlAccessError::TransactionRequired`] unless a transaction is active.
    Mandatory,
}

/// Entry point: a connection source plus the sink classified failures are reported to.
pub struct Database<S> {
    source: S,
    diagnostics: Arc<dyn DiagnosticsSink>,
}

impl<S: fmt::Debug> fmt::Debug for Database<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl<S: ConnectionSource> Database<S> {
    /// Wrap `source`, reporting through [`TracingSink`].
    pub fn new(source: S) -> Self {
        Self {
            source,
            diagnostics: Arc::new(TracingSink),
        }
    }

    /// Replace the diagnostics sink.
    #[must_use]
    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = sink;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// An executor outside any transaction.
    pub fn executor(&self) -> Executor<'_, S> {
        Executor {
            db: self,
            bound: None,
        }
    }

    /// See [`Executor::execute`].
    ///
    /// # Errors
    /// See [`Executor::execute`].
    pub fn execute(&self, stmt: &dyn SqlStatement) -> Result<(), SqlAccessError> {
        self.executor().execute(stmt)
    }

    /// See [`Executor::select_first`].
    ///
    /// # Errors
    /// See [`Executor::select_first`].
    pub fn select_first<T, M>(&self, stmt: &Statement<'_>, mapper: M) -> Result<Option<T>, SqlAccessError>
    where
        M: FnOnce(&Row) -> Result<T, SqlAccessError>,
    {
        self.executor().select_first(stmt, mapper)
    }

    /// See [`Executor::select_many`].
    ///
    /// # Errors
    /// See [`Executor::select_many`].
    pub fn select_many<T, M>(&self, stmt: &dyn SqlStatement, mapper: M) -> Result<Vec<T>, SqlAccessError>
    where
        M: FnMut(&Row) -> Result<T, SqlAccessError>,
    {
        self.executor().select_many(stmt, mapper)
    }

    /// Run `work` in a new transaction ([`Propagation::Required`] from outside any transaction).
    ///
    /// # Errors
    /// Whatever `work` returns, or the classified failure to begin or commit.
    pub fn with_transaction<'d, T, F>(&'d self, work: F) -> Result<T, SqlAccessError>
    where
        F: FnOnce(&Executor<'d, S>) -> Result<T, SqlAccessError>,
    {
        Executor::begin(self)?.complete(work)
    }

    /// Same as [`Database::with_transaction`]; from outside a transaction both start a new one.
    ///
    /// # Errors
    /// Whatever `work` returns, or the classified failure to begin or commit.
    pub fn with_new_transaction<'d, T, F>(&'d self, work: F) -> Result<T, SqlAccessError>
    where
        F: FnOnce(&Executor<'d, S>) -> Result<T, SqlAccessError>,
    {
        Executor::begin(self)?.complete(work)
    }

    fn classifier(&self) -> ErrorClassifier<'_> {
        ErrorClassifier::new(self.diagnostics.as_ref())
    }
}

/// Runs statements against a [`Database`], optionally inside one transaction.
///
/// Each operation acquires its connection, prepared statement and cursor and releases them
/// before returning. Inside a transaction the connection is the transaction's; a mapper that
/// issues another statement while a cursor is open gets [`SqlAccessError::ConnectionBusy`].
pub struct Executor<'d, S: ConnectionSource + 'd> {
    db: &'d Database<S>,
    bound: Option<RefCell<S::Guard<'d>>>,
}

impl<'d, S: ConnectionSource + 'd> Executor<'d, S> {
    /// Whether this executor runs inside an open transaction.
    #[must_use]
    pub fn is_transaction_active(&self) -> bool {
        self.bound.is_some()
    }

    /// Run `work` under the given demarcation.
    ///
    /// # Errors
    /// [`SqlAccessError::TransactionRequired`] for [`Propagation::Mandatory`] outside a
    /// transaction, the classified failure to begin or commit, or whatever `work` returns.
    pub fn transact<T, F>(&self, propagation: Propagation, work: F) -> Result<T, SqlAccessError>
    where
        F: FnOnce(&Executor<'d, S>) -> Result<T, SqlAccessError>,
    {
        match propagation {
            Propagation::Supports => work(self),
            Propagation::Mandatory | Propagation::Required if self.is_transaction_active() => work(self),
            Propagation::Mandatory => Err(SqlAccessError::TransactionRequired),
            Propagation::Required | Propagation::RequiresNew => Executor::begin(self.db)?.complete(work),
        }
    }

    /// [`Propagation::Mandatory`]: run `work` in the active transaction.
    ///
    /// # Errors
    /// [`SqlAccessError::TransactionRequired`] when no transaction is active, or whatever `work`
    /// returns.
    pub fn in_transaction<T, F>(&self, work: F) -> Result<T, SqlAccessError>
    where
        F: FnOnce(&Executor<'d, S>) -> Result<T, SqlAccessError>,
    {
        self.transact(Propagation::Mandatory, work)
    }

    /// [`Propagation::Required`]: join the active transaction or start one.
    ///
    /// A transaction started here commits when `work` succeeds and rolls back when it fails.
    ///
    /// # Errors
    /// Whatever `work` returns, or the classified failure to begin or commit.
    pub fn with_transaction<T, F>(&self, work: F) -> Result<T, SqlAccessError>
    where
        F: FnOnce(&Executor<'d, S>) -> Result<T, SqlAccessError>,
    {
        self.transact(Propagation::Required, work)
    }

    /// [`Propagation::RequiresNew`]: run `work` in an independent transaction on a fresh
    /// connection, leaving any active transaction untouched.
    ///
    /// # Errors
    /// Whatever `work` returns, or the classified failure to begin or commit.
    pub fn with_new_transaction<T, F>(&self, work: F) -> Result<T, SqlAccessError>
    where
        F: FnOnce(&Executor<'d, S>) -> Result<T, SqlAccessError>,
    {
        self.transact(Propagation::RequiresNew, work)
    }

    /// Run a statement and discard its result. [`Propagation::Supports`].
    ///
    /// # Errors
    /// The classified driver failure.
    pub fn execute(&self, stmt: &dyn SqlStatement) -> Result<(), SqlAccessError> {
        self.trace(stmt);
        self.run(AccessPath::Read, |conn| {
            prepare_bound(conn, stmt, None)?.execute()?;
            Ok(())
        })
    }

    /// Run a write and return the affected row count. [`Propagation::Mandatory`].
    ///
    /// A unique violation becomes [`SqlAccessError::Conflict`] with an empty violation set.
    ///
    /// # Errors
    /// [`SqlAccessError::TransactionRequired`] outside a transaction, or the classified failure.
    pub fn update(&self, stmt: &dyn SqlStatement) -> Result<u64, SqlAccessError> {
        self.write(stmt, None)
    }

    /// Like [`Executor::update`], but a unique violation runs `fallback` on the same connection
    /// and the conflict carries what it found. [`Propagation::Mandatory`].
    ///
    /// # Errors
    /// [`SqlAccessError::TransactionRequired`] outside a transaction, or the classified failure.
    pub fn update_with_fallback(
        &self,
        stmt: &dyn SqlStatement,
        fallback: &UniqueViolationQuery<'_>,
    ) -> Result<u64, SqlAccessError> {
        self.write(stmt, Some(fallback))
    }

    /// Run a write whose text returns rows (`... RETURNING ...`) and map the first one.
    /// [`Propagation::Mandatory`].
    ///
    /// # Errors
    /// [`SqlAccessError::TransactionRequired`] outside a transaction, the classified failure, or
    /// whatever `mapper` returns.
    pub fn update_returning<T, M>(&self, stmt: &dyn SqlStatement, mapper: M) -> Result<Option<T>, SqlAccessError>
    where
        M: FnOnce(&Row) -> Result<T, SqlAccessError>,
    {
        self.ensure(Propagation::Mandatory)?;
        self.trace(stmt);
        self.run(AccessPath::Write { fallback: None }, |conn| read_first(conn, stmt, mapper))
    }

    /// Run an insert and return the value of `column` for the inserted row.
    /// [`Propagation::Mandatory`].
    ///
    /// # Errors
    /// [`SqlAccessError::MissingGeneratedKey`] when nothing was inserted or the key is NULL,
    /// [`SqlAccessError::TransactionRequired`] outside a transaction, or the classified failure.
    pub fn insert_returning_key<K: FromRowValue>(
        &self,
        stmt: &dyn SqlStatement,
        column: &str,
    ) -> Result<K, SqlAccessError> {
        self.ensure(Propagation::Mandatory)?;
        self.trace(stmt);
        self.run(AccessPath::Write { fallback: None }, |conn| {
            let mut prepared = prepare_bound(conn, stmt, Some(&[column]))?;
            prepared.execute_update()?;
            let mut keys = RowCursor::new(prepared.generated_keys()?);
            if !keys.advance()? {
                return Err(SqlAccessError::MissingGeneratedKey.into());
            }
            let key: Option<K> = keys.row().first()?;
            key.ok_or_else(|| SqlAccessError::MissingGeneratedKey.into())
        })
    }

    /// [`Executor::insert_returning_key`] for the `uuid` column.
    ///
    /// # Errors
    /// See [`Executor::insert_returning_key`].
    pub fn insert_returning_uuid(&self, stmt: &dyn SqlStatement) -> Result<Uuid, SqlAccessError> {
        self.insert_returning_key(stmt, UUID_COLUMN)
    }

    /// Map the first row of a query, which is limited to one row. [`Propagation::Supports`].
    ///
    /// # Errors
    /// The classified driver failure or whatever `mapper` returns.
    pub fn select_first<T, M>(&self, stmt: &Statement<'_>, mapper: M) -> Result<Option<T>, SqlAccessError>
    where
        M: FnOnce(&Row) -> Result<T, SqlAccessError>,
    {
        let first = stmt.page(Some(1), None);
        self.trace(&first);
        self.run(AccessPath::Read, |conn| read_first(conn, &first, mapper))
    }

    /// Map every row of a query, plain or paged. [`Propagation::Supports`].
    ///
    /// # Errors
    /// The classified driver failure or the first error `mapper` returns.
    pub fn select_many<T, M>(&self, stmt: &dyn SqlStatement, mut mapper: M) -> Result<Vec<T>, SqlAccessError>
    where
        M: FnMut(&Row) -> Result<T, SqlAccessError>,
    {
        self.trace(stmt);
        self.run(AccessPath::Read, |conn| {
            let mut prepared = prepare_bound(conn, stmt, None)?;
            let mut cursor = RowCursor::new(prepared.execute_query()?);
            let mut rows = Vec::new();
            while cursor.advance()? {
                rows.push(mapper(cursor.row())?);
            }
            Ok(rows)
        })
    }

    fn write(
        &self,
        stmt: &dyn SqlStatement,
        fallback: Option<&UniqueViolationQuery<'_>>,
    ) -> Result<u64, SqlAccessError> {
        self.ensure(Propagation::Mandatory)?;
        self.trace(stmt);
        self.run(AccessPath::Write { fallback }, |conn| {
            Ok(prepare_bound(conn, stmt, None)?.execute_update()?)
        })
    }

    fn begin(db: &'d Database<S>) -> Result<Self, SqlAccessError> {
        let classifier = db.classifier();
        let mut guard = db.source.acquire().map_err(|err| classifier.classify(err))?;
        guard.begin().map_err(|err| classifier.classify(err))?;
        Ok(Executor {
            db,
            bound: Some(RefCell::new(guard)),
        })
    }

    /// Run `work` on this freshly begun executor, then commit or roll back.
    fn complete<T, F>(mut self, work: F) -> Result<T, SqlAccessError>
    where
        F: FnOnce(&Executor<'d, S>) -> Result<T, SqlAccessError>,
    {
        let outcome = work(&self);
        let Some(cell) = self.bound.take() else {
            return outcome;
        };
        let mut guard = cell.into_inner();
        match outcome {
            Ok(value) => match guard.commit() {
                Ok(()) => Ok(value),
                Err(err) => {
                    self.abandon(&mut *guard);
                    Err(self.db.classifier().classify(err))
                }
            },
            Err(err) => {
                self.abandon(&mut *guard);
                Err(err)
            }
        }
    }

    fn abandon(&self, conn: &mut S::Connection) {
        if let Err(err) = conn.rollback() {
            emit(
                self.db.diagnostics.as_ref(),
                Severity::Low,
                format_args!("transaction rollback failed: {err}"),
            );
        }
    }

    fn ensure(&self, propagation: Propagation) -> Result<(), SqlAccessError> {
        if propagation == Propagation::Mandatory && !self.is_transaction_active() {
            return Err(SqlAccessError::TransactionRequired);
        }
        Ok(())
    }

    fn trace(&self, stmt: &dyn SqlStatement) {
        let sink = self.db.diagnostics.as_ref();
        if sink.enabled(Severity::Low) {
            sink.record(Severity::Low, &normalize_sql(stmt.sql()));
        }
    }

    fn lease(&self) -> Result<Lease<'_, 'd, S>, Failure> {
        match &self.bound {
            Some(cell) => cell
                .try_borrow_mut()
                .map(Lease::Bound)
                .map_err(|_| SqlAccessError::ConnectionBusy.into()),
            None => Ok(Lease::Pooled(self.db.source.acquire()?)),
        }
    }

    /// Acquire a connection, run `work`, and classify any driver failure while the connection is
    /// still held so the fallback read sees the same session.
    fn run<T, W>(&self, path: AccessPath<'_, '_>, work: W) -> Result<T, SqlAccessError>
    where
        W: FnOnce(&mut S::Connection) -> Result<T, Failure>,
    {
        let classifier = self.db.classifier();
        let mut lease = self.lease().map_err(|failure| failure.classify(&classifier))?;
        let guarded = matches!(path, AccessPath::Write { fallback: Some(_) });
        if guarded {
            lease
                .savepoint(FALLBACK_SAVEPOINT)
                .map_err(|err| classifier.classify(err))?;
        }

        match work(&mut *lease) {
            Ok(value) => {
                if guarded {
                    lease
                        .release_savepoint(FALLBACK_SAVEPOINT)
                        .map_err(|err| classifier.classify(err))?;
                }
                Ok(value)
            }
            Err(failure) => {
                if guarded {
                    self.undo_savepoint(&mut *lease);
                }
                let err = match failure {
                    Failure::Access(err) => err,
                    Failure::Driver(err) => match path {
                        AccessPath::Read => classifier.classify(err),
                        AccessPath::Write { fallback } => classifier.classify_write(err, || match fallback {
                            Some(query) => self.recover(&mut *lease, query),
                            None => Ok(None),
                        }),
                    },
                };
                if guarded {
                    self.release_savepoint(&mut *lease);
                }
                Err(err)
            }
        }
    }

    /// Roll the failed write back to its savepoint so the transaction accepts statements again.
    fn undo_savepoint(&self, conn: &mut S::Connection) {
        if let Err(err) = conn.rollback_to_savepoint(FALLBACK_SAVEPOINT) {
            emit(
                self.db.diagnostics.as_ref(),
                Severity::Low,
                format_args!("rollback to savepoint failed: {err}"),
            );
        }
    }

    fn release_savepoint(&self, conn: &mut S::Connection) {
        if let Err(err) = conn.release_savepoint(FALLBACK_SAVEPOINT) {
            emit(
                self.db.diagnostics.as_ref(),
                Severity::Low,
                format_args!("savepoint release failed: {err}"),
            );
        }
    }

    fn recover(
        &self,
        conn: &mut S::Connection,
        query: &UniqueViolationQuery<'_>,
    ) -> Result<Option<ViolationSet>, SqlAccessError> {
        let capped = query.statement().page(Some(1), None);
        self.trace(&capped);
        read_first(conn, &capped, |row| query.convert(row)).map_err(Failure::into_unclassified)
    }
}

impl<'d, S: ConnectionSource + 'd> Drop for Executor<'d, S> {
    fn drop(&mut self) {
        // Only reached with a live transaction when `work` unwound.
        if let Some(cell) = self.bound.take() {
            let mut guard = cell.into_inner();
            self.abandon(&mut *guard);
        }
    }
}

/// Connection for one call: checked out of the pool, or borrowed from the bound transaction.
enum Lease<'e, 'd, S: ConnectionSource + 'd> {
    Pooled(S::Guard<'d>),
    Bound(RefMut<'e, S::Guard<'d>>),
}

impl<'d, S: ConnectionSource + 'd> Deref for Lease<'_, 'd, S> {
    type Target = S::Connection;

    fn deref(&self) -> &S::Connection {
        match self {
            Lease::Pooled(guard) => &**guard,
            Lease::Bound(guard) => &***guard,
        }
    }
}

impl<'d, S: ConnectionSource + 'd> DerefMut for Lease<'_, 'd, S> {
    fn deref_mut(&mut self) -> &mut S::Connection {
        match self {
            Lease::Pooled(guard) => &mut **guard,
            Lease::Bound(guard) => &mut ***guard,
        }
    }
}

/// Failure inside a call, before classification.
pub(crate) enum Failure {
    Driver(DriverError),
    Access(SqlAccessError),
}

impl Failure {
    fn classify(self, classifier: &ErrorClassifier<'_>) -> SqlAccessError {
        match self {
            Failure::Driver(err) => classifier.classify(err),
            Failure::Access(err) => err,
        }
    }

    fn into_unclassified(self) -> SqlAccessError {
        match self {
            Failure::Driver(err) => SqlAccessError::Unknown(err),
            Failure::Access(err) => err,
        }
    }
}

impl From<DriverError> for Failure {
    fn from(err: DriverError) -> Self {
        Failure::Driver(err)
    }
}

impl From<SqlAccessError> for Failure {
    fn from(err: SqlAccessError) -> Self {
        Failure::Access(err)
    }
}

fn prepare_bound<'c, C: Connection>(
    conn: &'c mut C,
    stmt: &dyn SqlStatement,
    returning: Option<&[&str]>,
) -> Result<C::Prepared<'c>, DriverError> {
    let mut prepared = conn.prepare(stmt.sql(), returning)?;
    stmt.bind_all(&mut ParameterBinder::new(&mut prepared))?;
    Ok(prepared)
}

fn read_first<C, T, M>(conn: &mut C, stmt: &dyn SqlStatement, mapper: M) -> Result<Option<T>, Failure>
where
    C: Connection,
    M: FnOnce(&Row) -> Result<T, SqlAccessError>,
{
    let mut prepared = prepare_bound(conn, stmt, None)?;
    let mut cursor = RowCursor::new(prepared.execute_query()?);
    if cursor.advance()? {
        Ok(Some(mapper(cursor.row())?))
    } else {
        Ok(None)
    }
}
