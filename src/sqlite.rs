//! SQLite backend over `rusqlite`, pooled with `r2d2`.
//!
//! Values are stored the way SQLite stores them: integers and booleans as `INTEGER`, UUIDs,
//! decimals, dates and timestamps as `TEXT`. Row accessors parse them back.

mod config;
mod connection;
mod error;
mod params;
mod query;

pub use config::{SqliteOptions, SqliteOptionsBuilder, SqlitePool};
pub use connection::{SqliteConnection, SqliteManager};
pub use query::{SqlitePrepared, SqliteRows};
