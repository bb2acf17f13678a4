//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::binder::ParameterBinder;
pub use crate::diagnostics::{DiagnosticsSink, MemorySink, Severity, TracingSink};
pub use crate::driver::{Connection, ConnectionSource, PreparedHandle, ResultStream};
pub use crate::error::{DriverError, SqlAccessError};
pub use crate::executor::{Database, Executor, Propagation};
pub use crate::fallback::{FallbackQuery, UniqueViolationQuery, ViolationSet};
pub use crate::results::{FromRowValue, ResultSet, Row};
pub use crate::state::SqlState;
pub use crate::statement::{PagedStatement, SqlStatement, Statement, StatementBinder};
pub use crate::translation::number_placeholders;
pub use crate::types::RowValues;

#[cfg(feature = "postgres")]
pub use crate::postgres::{PostgresOptions, PostgresPool};
#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteOptions, SqlitePool};
