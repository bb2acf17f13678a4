use std::path::PathBuf;
use std::time::Duration;

use super::query::SqlitePrepared;
use crate::driver::Connection;
use crate::error::DriverError;

/// A pooled SQLite session.
pub struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl SqliteConnection {
    /// Borrow the underlying `rusqlite` connection, e.g. for schema setup.
    #[must_use]
    pub fn raw(&self) -> &rusqlite::Connection {
        &self.conn
    }

    fn batch(&self, sql: &str) -> Result<(), DriverError> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }
}

impl Connection for SqliteConnection {
    type Prepared<'c> = SqlitePrepared<'c>;

    fn prepare<'c>(
        &'c mut self,
        text: &str,
        returning: Option<&[&str]>,
    ) -> Result<SqlitePrepared<'c>, DriverError> {
        let stmt = match returning {
            Some(columns) => self
                .conn
                .prepare_cached(&format!("{text} RETURNING {}", columns.join(", ")))?,
            None => self.conn.prepare_cached(text)?,
        };
        Ok(SqlitePrepared::new(stmt, returning.is_some()))
    }

    fn begin(&mut self) -> Result<(), DriverError> {
        self.batch("BEGIN")
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        self.batch("COMMIT")
    }

    fn rollback(&mut self) -> Result<(), DriverError> {
        self.batch("ROLLBACK")
    }

    fn savepoint(&mut self, name: &str) -> Result<(), DriverError> {
        self.batch(&format!("SAVEPOINT {name}"))
    }

    fn release_savepoint(&mut self, name: &str) -> Result<(), DriverError> {
        self.batch(&format!("RELEASE SAVEPOINT {name}"))
    }

    fn rollback_to_savepoint(&mut self, name: &str) -> Result<(), DriverError> {
        self.batch(&format!("ROLLBACK TO SAVEPOINT {name}"))
    }
}

/// `r2d2` manager opening SQLite connections on one database file.
#[derive(Debug, Clone)]
pub struct SqliteManager {
    db_path: PathBuf,
    busy_timeout: Duration,
    wal: bool,
}

impl SqliteManager {
    #[must_use]
    pub fn new(db_path: impl Into<PathBuf>, busy_timeout: Duration, wal: bool) -> Self {
        Self {
            db_path: db_path.into(),
            busy_timeout,
            wal,
        }
    }
}

impl r2d2::ManageConnection for SqliteManager {
    type Connection = SqliteConnection;
    type Error = rusqlite::Error;

    fn connect(&self) -> Result<SqliteConnection, rusqlite::Error> {
        let conn = rusqlite::Connection::open(&self.db_path)?;
        conn.busy_timeout(self.busy_timeout)?;
        if self.wal {
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        }
        Ok(SqliteConnection { conn })
    }

    fn is_valid(&self, conn: &mut SqliteConnection) -> Result<(), rusqlite::Error> {
        conn.conn.query_row("SELECT 1", [], |_| Ok(()))
    }

    fn has_broken(&self, conn: &mut SqliteConnection) -> bool {
        // A session still inside a transaction must not be handed out again.
        !conn.conn.is_autocommit()
    }
}
