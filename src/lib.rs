//! Typed, synchronous access to pooled SQLite and PostgreSQL connections.
//!
//! Statements are plain SQL with `?` placeholders, bound by position through a
//! [`ParameterBinder`]. Rows are read through null-aware [`Row`] accessors, and driver failures
//! come back as a classified [`SqlAccessError`]: a unique violation on a write becomes
//! [`SqlAccessError::Conflict`] carrying the colliding values, an unreachable database becomes
//! [`SqlAccessError::Unavailable`].
//!
//! ```rust,no_run
//! use sql_access::prelude::*;
//!
//! # fn demo() -> Result<(), SqlAccessError> {
//! let db = SqliteOptions::new("library.db").build()?;
//! let titles = db.select_many(
//!     &Statement::with_params("SELECT title FROM book WHERE in_stock = ?", [true]),
//!     |row| row.get_string("title"),
//! )?;
//! # let _ = titles;
//! # Ok(()) }
//! ```

pub mod binder;
mod classify;
pub mod diagnostics;
pub mod driver;
pub mod error;
pub mod executor;
pub mod fallback;
pub mod prelude;
pub mod results;
pub mod state;
pub mod statement;
pub mod translation;
pub mod types;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;
#[cfg(feature = "test-utils-postgres")]
pub mod test_utils;

pub use binder::ParameterBinder;
pub use error::{DriverError, DriverErrorKind, SqlAccessError};
pub use executor::{Database, Executor, Propagation};
pub use fallback::{FallbackQuery, UniqueViolationQuery, ViolationSet};
pub use results::{ResultSet, Row};
pub use statement::{PagedStatement, SqlStatement, Statement};
pub use types::RowValues;
