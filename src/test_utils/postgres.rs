use postgresql_embedded::blocking::PostgreSQL;

use crate::executor::Database;
use crate::postgres::{PostgresOptions, PostgresPool};
use crate::statement::Statement;

/// A running embedded `PostgreSQL` instance and the options that reach it.
pub struct EmbeddedPostgres {
    pub postgresql: PostgreSQL,
    pub port: u16,
    pub database_url: String,
    pub options: PostgresOptions,
}

impl EmbeddedPostgres {
    /// Open a pool on the embedded database.
    ///
    /// # Errors
    /// Returns an error if the options are rejected.
    pub fn database(&self) -> Result<Database<PostgresPool>, Box<dyn std::error::Error>> {
        Ok(self.options.clone().build()?)
    }
}

/// Set up an embedded `PostgreSQL` instance with database `dbname`.
///
/// # Errors
/// Returns an error if the embedded server cannot be set up or started, the database cannot be
/// created, or the post-start connectivity check fails.
pub fn setup_postgres_embedded(dbname: &str) -> Result<EmbeddedPostgres, Box<dyn std::error::Error>> {
    let mut postgresql = PostgreSQL::default();
    postgresql.setup()?;
    postgresql.start()?;
    postgresql.create_database(dbname)?;

    let settings = postgresql.settings();
    let port = settings.port;
    let host = settings.host.clone();
    let user = settings.username.clone();
    let password = settings.password.clone();
    let database_url = format!("postgres://{user}:{password}@{host}:{port}/{dbname}");

    let options = PostgresOptions::builder()
        .host(host)
        .port(port)
        .dbname(dbname)
        .user(user)
        .password(password)
        .max_connections(4)
        .finish();

    // Quick connection test
    let db = options.clone().build()?;
    db.execute(&Statement::new("SELECT 1"))?;
    tracing::debug!(target: "sql_access", "embedded PostgreSQL ready at {database_url}");

    Ok(EmbeddedPostgres {
        postgresql,
        port,
        database_url,
        options,
    })
}

/// Stop a previously started embedded `PostgreSQL` instance.
pub fn stop_postgres_embedded(postgres: EmbeddedPostgres) {
    let EmbeddedPostgres { postgresql, .. } = postgres;
    let _ = postgresql.stop();
}
