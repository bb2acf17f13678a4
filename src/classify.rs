use crate::diagnostics::{DiagnosticsSink, Severity, emit};
use crate::error::{DriverError, SqlAccessError};
use crate::fallback::{UniqueViolationQuery, ViolationSet};
use crate::state::SqlState;

/// How a failing call reached the database, which decides whether conflicts are recovered.
#[derive(Clone, Copy)]
pub(crate) enum AccessPath<'q, 'a> {
    Read,
    Write {
        fallback: Option<&'q UniqueViolationQuery<'a>>,
    },
}

/// Turns raw driver failures into [`SqlAccessError`], reporting through the database's sink.
pub(crate) struct ErrorClassifier<'d> {
    sink: &'d dyn DiagnosticsSink,
}

impl<'d> ErrorClassifier<'d> {
    pub(crate) fn new(sink: &'d dyn DiagnosticsSink) -> Self {
        Self { sink }
    }

    /// Classification shared by every path.
    pub(crate) fn classify(&self, err: DriverError) -> SqlAccessError {
        if err.is_timeout() {
            return SqlAccessError::Unavailable(err);
        }
        let state = err.sql_state().and_then(SqlState::from_code);
        match state {
            Some(SqlState::OutOfMemory) => SqlAccessError::Unavailable(err),
            Some(state) if state.is_connection_error() => {
                emit(
                    self.sink,
                    Severity::High,
                    format_args!("{} ({}) {}", state.name(), state.code(), err.message()),
                );
                SqlAccessError::Unavailable(err)
            }
            known => {
                emit(
                    self.sink,
                    Severity::Low,
                    format_args!(
                        "{} ({}) {}",
                        known.map_or("UNKNOWN_STATE", SqlState::name),
                        err.sql_state().unwrap_or(""),
                        err.message()
                    ),
                );
                SqlAccessError::Unknown(err)
            }
        }
    }

    /// Write-path classification: a unique violation runs `recover` and becomes a conflict.
    ///
    /// `recover` yields `Ok(None)` when there is nothing to look up. A failing recovery is only
    /// traced; the conflict is raised with an empty set.
    pub(crate) fn classify_write<R>(&self, err: DriverError, recover: R) -> SqlAccessError
    where
        R: FnOnce() -> Result<Option<ViolationSet>, SqlAccessError>,
    {
        if err.sql_state() != Some(SqlState::UniqueViolation.code()) {
            return self.classify(err);
        }
        let violations = match recover() {
            Ok(found) => found.unwrap_or_default(),
            Err(fallback_err) => {
                emit(
                    self.sink,
                    Severity::Low,
                    format_args!("fallback query after unique violation failed: {fallback_err}"),
                );
                ViolationSet::new()
            }
        };
        SqlAccessError::Conflict {
            violations,
            cause: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use crate::types::RowValues;

    fn coded(code: &str) -> DriverError {
        DriverError::new("boom").with_state(code)
    }

    #[test]
    fn timeouts_and_memory_pressure_are_unavailable() {
        let sink = MemorySink::new();
        let classifier = ErrorClassifier::new(&sink);
        assert!(classifier.classify(DriverError::timeout("slow")).is_retriable());
        assert!(classifier.classify(coded("53200")).is_retriable());
        assert!(sink.entries().is_empty());
    }

    #[test]
    fn connection_errors_raise_a_high_diagnostic() {
        let sink = MemorySink::new();
        let classifier = ErrorClassifier::new(&sink);
        for code in ["08001", "08003", "08004", "08006", "08007"] {
            assert!(classifier.classify(coded(code)).is_retriable());
        }
        let high = sink.messages(Severity::High);
        assert_eq!(high.len(), 5);
        assert_eq!(high[0], "CONNECTION_UNABLE_TO_CONNECT (08001) boom");
    }

    #[test]
    fn everything_else_is_unknown_and_traced() {
        let sink = MemorySink::new();
        let classifier = ErrorClassifier::new(&sink);
        assert!(matches!(classifier.classify(coded("42601")), SqlAccessError::Unknown(_)));
        assert!(matches!(classifier.classify(DriverError::new("odd")), SqlAccessError::Unknown(_)));
        assert_eq!(
            sink.messages(Severity::Low),
            vec!["SYNTAX_ERROR (42601) boom".to_string(), "UNKNOWN_STATE () odd".to_string()]
        );
    }

    #[test]
    fn read_path_unique_violation_is_unknown() {
        let sink = MemorySink::new();
        let err = ErrorClassifier::new(&sink).classify(coded("23505"));
        assert!(matches!(err, SqlAccessError::Unknown(_)));
    }

    #[test]
    fn write_path_unique_violation_recovers_violations() {
        let sink = MemorySink::new();
        let classifier = ErrorClassifier::new(&sink);
        let err = classifier.classify_write(coded("23505"), || {
            let mut found = ViolationSet::new();
            found.insert("title".into(), RowValues::Text("Alpha".into()));
            Ok(Some(found))
        });
        assert_eq!(
            err.violations().and_then(|v| v.get("title")),
            Some(&RowValues::Text("Alpha".into()))
        );
    }

    #[test]
    fn failed_recovery_still_conflicts() {
        let sink = MemorySink::new();
        let classifier = ErrorClassifier::new(&sink);
        let err = classifier.classify_write(coded("23505"), || {
            Err(SqlAccessError::Unknown(DriverError::new("fallback broke")))
        });
        assert!(err.is_conflict());
        assert_eq!(err.violations().map(ViolationSet::len), Some(0));
        assert_eq!(sink.messages(Severity::Low).len(), 1);

        let untouched = classifier.classify_write(coded("23503"), || Ok(None));
        assert!(matches!(untouched, SqlAccessError::Unknown(_)));
    }
}
