use std::time::Duration;

use serde::Deserialize;

use super::connection::SqliteManager;
use crate::error::SqlAccessError;
use crate::executor::Database;

pub type SqlitePool = r2d2::Pool<SqliteManager>;

fn default_max_connections() -> u32 {
    8
}

fn default_connection_timeout_ms() -> u64 {
    30_000
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_wal() -> bool {
    true
}

/// Options for configuring a `SQLite` pool.
///
/// Deserializes from configuration files; every field but `db_path` has a default.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteOptions {
    pub db_path: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// How long a checkout waits for a free connection.
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,
    /// How long a statement waits on a locked database before failing as busy.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    #[serde(default = "default_wal")]
    pub wal: bool,
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            max_connections: default_max_connections(),
            connection_timeout_ms: default_connection_timeout_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
            wal: default_wal(),
        }
    }

    #[must_use]
    pub fn builder(db_path: impl Into<String>) -> SqliteOptionsBuilder {
        SqliteOptionsBuilder::new(db_path)
    }

    /// Open the pool and wrap it in a [`Database`].
    ///
    /// # Errors
    ///
    /// Returns `SqlAccessError::ConfigError` if the options are invalid or no connection can be
    /// opened within the connection timeout.
    pub fn build(self) -> Result<Database<SqlitePool>, SqlAccessError> {
        if self.db_path.trim().is_empty() {
            return Err(SqlAccessError::ConfigError("db_path is required".to_string()));
        }
        if self.max_connections == 0 {
            return Err(SqlAccessError::ConfigError(
                "max_connections must be at least 1".to_string(),
            ));
        }

        let manager = SqliteManager::new(
            &self.db_path,
            Duration::from_millis(self.busy_timeout_ms),
            self.wal,
        );
        let pool = r2d2::Pool::builder()
            .max_size(self.max_connections)
            .connection_timeout(Duration::from_millis(self.connection_timeout_ms))
            .build(manager)
            .map_err(|e| SqlAccessError::ConfigError(format!("Failed to create SQLite pool: {e}")))?;

        Ok(Database::new(pool))
    }
}

/// Fluent builder for `SQLite` options.
#[derive(Debug, Clone)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            opts: SqliteOptions::new(db_path),
        }
    }

    #[must_use]
    pub fn max_connections(mut self, max_connections: u32) -> Self {
        self.opts.max_connections = max_connections;
        self
    }

    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.opts.connection_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.opts.busy_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn wal(mut self, wal: bool) -> Self {
        self.opts.wal = wal;
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }

    /// Build a [`Database`] backed by a `SQLite` pool.
    ///
    /// # Errors
    ///
    /// See [`SqliteOptions::build`].
    pub fn build(self) -> Result<Database<SqlitePool>, SqlAccessError> {
        self.finish().build()
    }
}
