use std::error::Error as StdError;

use thiserror::Error;

use crate::fallback::ViolationSet;

/// Coarse category of a raw driver failure, decided by the backend adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverErrorKind {
    /// The driver or pool gave up waiting (statement timeout, busy database, pool checkout).
    Timeout,
    /// Any other failure; the SQLSTATE code (if any) says what happened.
    Other,
}

/// A failure reported by a database driver, before classification.
///
/// Backends translate their native errors into this shape so the classifier only has to look at
/// a SQLSTATE code and a timeout flag.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct DriverError {
    kind: DriverErrorKind,
    sql_state: Option<String>,
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl DriverError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            kind: DriverErrorKind::Other,
            sql_state: None,
            message: message.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: DriverErrorKind::Timeout,
            ..Self::new(message)
        }
    }

    /// Attach the five-character SQLSTATE reported by the server.
    #[must_use]
    pub fn with_state(mut self, sql_state: impl Into<String>) -> Self {
        self.sql_state = Some(sql_state.into());
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    #[must_use]
    pub fn kind(&self) -> DriverErrorKind {
        self.kind
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.kind == DriverErrorKind::Timeout
    }

    #[must_use]
    pub fn sql_state(&self) -> Option<&str> {
        self.sql_state.as_deref()
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors surfaced to callers of the access layer.
///
/// Driver failures are classified exactly once into `Unavailable`, `Conflict` or `Unknown`; the
/// remaining variants come from row mapping, key retrieval and transaction scoping.
#[derive(Debug, Error)]
pub enum SqlAccessError {
    /// The database is unreachable, out of memory, or timed out. Retriable at a higher level.
    #[error("database unavailable: {0}")]
    Unavailable(#[source] DriverError),

    /// A write violated a unique constraint. `violations` holds what the fallback query recovered.
    #[error("unique constraint violated: {cause}")]
    Conflict {
        violations: ViolationSet,
        #[source]
        cause: DriverError,
    },

    /// Any other driver failure.
    #[error("database error: {0}")]
    Unknown(#[source] DriverError),

    #[error("column {column} holds {found} and cannot be read as {expected}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("column not found: {0}")]
    ColumnNotFound(String),

    #[error("the insert statement returned no generated key")]
    MissingGeneratedKey,

    #[error("this operation must run inside an active transaction")]
    TransactionRequired,

    #[error("the transaction connection is still held by an open cursor")]
    ConnectionBusy,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl SqlAccessError {
    /// Violations recovered for a conflict, `None` for every other variant.
    #[must_use]
    pub fn violations(&self) -> Option<&ViolationSet> {
        match self {
            SqlAccessError::Conflict { violations, .. } => Some(violations),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, SqlAccessError::Conflict { .. })
    }

    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(self, SqlAccessError::Unavailable(_))
    }

    /// The underlying driver failure for classified errors.
    #[must_use]
    pub fn driver_error(&self) -> Option<&DriverError> {
        match self {
            SqlAccessError::Unavailable(cause)
            | SqlAccessError::Unknown(cause)
            | SqlAccessError::Conflict { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

#[cfg(any(feature = "sqlite", feature = "postgres"))]
impl From<r2d2::Error> for DriverError {
    fn from(err: r2d2::Error) -> Self {
        // r2d2 only fails a checkout once its connection timeout has elapsed.
        DriverError::timeout(format!("connection pool checkout failed: {err}")).with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_error_keeps_state_and_kind() {
        let err = DriverError::timeout("too slow").with_state("57014");
        assert!(err.is_timeout());
        assert_eq!(err.sql_state(), Some("57014"));
        assert_eq!(err.to_string(), "too slow");
    }

    #[test]
    fn only_unavailable_is_retriable() {
        assert!(SqlAccessError::Unavailable(DriverError::new("down")).is_retriable());
        assert!(!SqlAccessError::Unknown(DriverError::new("bad")).is_retriable());
        assert!(!SqlAccessError::MissingGeneratedKey.is_retriable());
    }

    #[test]
    fn conflict_exposes_violations() {
        let mut violations = ViolationSet::new();
        violations.insert("title".into(), crate::types::RowValues::Text("Alpha".into()));
        let err = SqlAccessError::Conflict {
            violations,
            cause: DriverError::new("duplicate key").with_state("23505"),
        };
        assert!(err.is_conflict());
        assert_eq!(err.violations().map(|v| v.len()), Some(1));
        assert_eq!(err.driver_error().and_then(DriverError::sql_state), Some("23505"));
    }
}
