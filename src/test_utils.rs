//! Test utilities for `PostgreSQL` testing and benchmarking.

pub mod postgres;

pub use postgres::{EmbeddedPostgres, setup_postgres_embedded, stop_postgres_embedded};
