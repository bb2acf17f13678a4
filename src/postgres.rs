//! PostgreSQL backend over the synchronous `postgres` client, pooled with `r2d2`.
//!
//! Statements are written with `?` placeholders and renumbered to `$1..$n` before they reach the
//! server. Transactions are driven with plain `BEGIN`/`COMMIT` so a pooled client can be bound to
//! an executor without borrowing a `postgres::Transaction`.

mod config;
mod connection;
mod error;
mod params;
mod query;

pub use config::{PostgresOptions, PostgresOptionsBuilder, PostgresPool};
pub use connection::{PostgresConnection, PostgresManager};
pub use query::{PostgresPrepared, PostgresRows};
