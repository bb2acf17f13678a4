use std::time::Duration;

use serde::Deserialize;

use super::connection::PostgresManager;
use crate::error::SqlAccessError;
use crate::executor::Database;

pub type PostgresPool = r2d2::Pool<PostgresManager>;

fn default_max_connections() -> u32 {
    10
}

fn default_connection_timeout_ms() -> u64 {
    30_000
}

/// Connection settings for a PostgreSQL pool.
///
/// Every connection field is optional at deserialization time so a partially filled config file
/// is reported by [`build`](Self::build) with the name of the missing field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostgresOptions {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub dbname: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,
}

impl PostgresOptions {
    #[must_use]
    pub fn builder() -> PostgresOptionsBuilder {
        PostgresOptionsBuilder::default()
    }

    fn to_config(&self) -> Result<postgres::Config, SqlAccessError> {
        fn required<'a, T: ?Sized>(value: Option<&'a T>, name: &str) -> Result<&'a T, SqlAccessError> {
            value.ok_or_else(|| SqlAccessError::ConfigError(format!("{name} is required")))
        }

        let dbname = required(self.dbname.as_deref(), "dbname")?;
        let host = required(self.host.as_deref(), "host")?;
        let port = *required(self.port.as_ref(), "port")?;
        let user = required(self.user.as_deref(), "user")?;
        let password = required(self.password.as_deref(), "password")?;
        if self.max_connections == 0 {
            return Err(SqlAccessError::ConfigError(
                "max_connections must be at least 1".to_string(),
            ));
        }

        let mut config = postgres::Config::new();
        config
            .host(host)
            .port(port)
            .dbname(dbname)
            .user(user)
            .password(password)
            .connect_timeout(Duration::from_millis(self.connection_timeout_ms));
        Ok(config)
    }

    /// Create the pool and wrap it in a [`Database`].
    ///
    /// Connections are opened lazily; an unreachable server surfaces on first use as
    /// `SqlAccessError::Unavailable`.
    ///
    /// # Errors
    ///
    /// Returns `SqlAccessError::ConfigError` if a required field is missing.
    pub fn build(self) -> Result<Database<PostgresPool>, SqlAccessError> {
        let manager = PostgresManager::new(self.to_config()?);
        let pool = r2d2::Pool::builder()
            .max_size(self.max_connections)
            .min_idle(Some(0))
            .connection_timeout(Duration::from_millis(self.connection_timeout_ms))
            .build_unchecked(manager);
        Ok(Database::new(pool))
    }
}

/// Fluent builder for PostgreSQL options.
#[derive(Debug, Clone)]
pub struct PostgresOptionsBuilder {
    opts: PostgresOptions,
}

impl Default for PostgresOptionsBuilder {
    fn default() -> Self {
        Self {
            opts: PostgresOptions {
                max_connections: default_max_connections(),
                connection_timeout_ms: default_connection_timeout_ms(),
                ..PostgresOptions::default()
            },
        }
    }
}

impl PostgresOptionsBuilder {
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.opts.host = Some(host.into());
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.opts.port = Some(port);
        self
    }

    #[must_use]
    pub fn dbname(mut self, dbname: impl Into<String>) -> Self {
        self.opts.dbname = Some(dbname.into());
        self
    }

    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.opts.user = Some(user.into());
        self
    }

    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.opts.password = Some(password.into());
        self
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
    pub fn finish(self) -> PostgresOptions {
        self.opts
    }

    /// Build a [`Database`] backed by a PostgreSQL pool.
    ///
    /// # Errors
    ///
    /// See [`PostgresOptions::build`].
    pub fn build(self) -> Result<Database<PostgresPool>, SqlAccessError> {
        self.finish().build()
    }
}
