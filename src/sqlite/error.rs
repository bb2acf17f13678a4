use rusqlite::ErrorCode;
use rusqlite::ffi;

use crate::error::DriverError;
use crate::state::SqlState;

/// SQLSTATE for a SQLite result code, where one applies.
fn sql_state(code: ErrorCode, extended_code: i32) -> Option<SqlState> {
    match code {
        ErrorCode::ConstraintViolation => match extended_code {
            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => Some(SqlState::UniqueViolation),
            ffi::SQLITE_CONSTRAINT_NOTNULL => Some(SqlState::NotNullViolation),
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Some(SqlState::ForeignKeyViolation),
            ffi::SQLITE_CONSTRAINT_CHECK => Some(SqlState::CheckViolation),
            _ => None,
        },
        ErrorCode::OutOfMemory => Some(SqlState::OutOfMemory),
        ErrorCode::CannotOpen => Some(SqlState::ConnectionUnableToConnect),
        ErrorCode::TypeMismatch => Some(SqlState::DataTypeMismatch),
        ErrorCode::TooBig => Some(SqlState::StringDataRightTruncation),
        _ => None,
    }
}

impl From<rusqlite::Error> for DriverError {
    fn from(err: rusqlite::Error) -> Self {
        let message = err.to_string();
        let Some((code, extended_code)) = err.sqlite_error().map(|e| (e.code, e.extended_code)) else {
            return DriverError::new(message).with_source(err);
        };
        if matches!(code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) {
            return DriverError::timeout(message).with_source(err);
        }
        let driver_error = match sql_state(code, extended_code) {
            Some(state) => DriverError::new(message).with_state(state.code()),
            None => DriverError::new(message),
        };
        driver_error.with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(extended_code: i32) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(ffi::Error::new(extended_code), Some("constraint failed".into()))
    }

    #[test]
    fn constraint_codes_map_to_sql_states() {
        let unique = DriverError::from(failure(ffi::SQLITE_CONSTRAINT_UNIQUE));
        assert_eq!(unique.sql_state(), Some("23505"));
        let pk = DriverError::from(failure(ffi::SQLITE_CONSTRAINT_PRIMARYKEY));
        assert_eq!(pk.sql_state(), Some("23505"));
        let not_null = DriverError::from(failure(ffi::SQLITE_CONSTRAINT_NOTNULL));
        assert_eq!(not_null.sql_state(), Some("23502"));
    }

    #[test]
    fn busy_database_is_a_timeout() {
        let busy = DriverError::from(failure(ffi::SQLITE_BUSY));
        assert!(busy.is_timeout());
        assert_eq!(busy.sql_state(), None);
    }

    #[test]
    fn non_sqlite_failures_carry_no_state() {
        let err = DriverError::from(rusqlite::Error::InvalidColumnIndex(3));
        assert!(!err.is_timeout());
        assert_eq!(err.sql_state(), None);
    }
}
