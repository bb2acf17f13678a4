use postgres::{Client, Config, NoTls};

use super::query::PostgresPrepared;
use crate::driver::Connection;
use crate::error::DriverError;
use crate::translation::number_placeholders;

/// A pooled PostgreSQL session.
pub struct PostgresConnection {
    client: Client,
}

impl PostgresConnection {
    /// Borrow the underlying client, e.g. for schema setup with `batch_execute`.
    pub fn raw(&mut self) -> &mut Client {
        &mut self.client
    }

    fn batch(&mut self, sql: &str) -> Result<(), DriverError> {
        self.client.batch_execute(sql)?;
        Ok(())
    }
}

impl Connection for PostgresConnection {
    type Prepared<'c> = PostgresPrepared<'c>;

    fn prepare<'c>(
        &'c mut self,
        text: &str,
        returning: Option<&[&str]>,
    ) -> Result<PostgresPrepared<'c>, DriverError> {
        let numbered = number_placeholders(text);
        let statement = match returning {
            Some(columns) => self
                .client
                .prepare(&format!("{numbered} RETURNING {}", columns.join(", ")))?,
            None => self.client.prepare(&numbered)?,
        };
        Ok(PostgresPrepared::new(
            &mut self.client,
            statement,
            returning.is_some(),
        ))
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

/// `r2d2` manager opening plain-TCP PostgreSQL sessions.
#[derive(Debug, Clone)]
pub struct PostgresManager {
    config: Config,
}

impl PostgresManager {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl r2d2::ManageConnection for PostgresManager {
    type Connection = PostgresConnection;
    type Error = postgres::Error;

    fn connect(&self) -> Result<PostgresConnection, postgres::Error> {
        let client = self.config.connect(NoTls)?;
        Ok(PostgresConnection { client })
    }

    fn is_valid(&self, conn: &mut PostgresConnection) -> Result<(), postgres::Error> {
        conn.client.batch_execute("SELECT 1")
    }

    fn has_broken(&self, conn: &mut PostgresConnection) -> bool {
        conn.client.is_closed()
    }
}
