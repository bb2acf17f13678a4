//! SQLSTATE reference table.
//!
//! Codes are the five-character values PostgreSQL reports; the SQLite adapter translates its
//! extended result codes onto the same table.

macro_rules! sql_states {
    ($($variant:ident => $code:literal, $name:literal;)*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum SqlState {
            $($variant,)*
        }

        impl SqlState {
            /// Every known state, in table order.
            pub const ALL: &'static [SqlState] = &[$(SqlState::$variant,)*];

            /// The five-character SQLSTATE code.
            #[must_use]
            pub fn code(self) -> &'static str {
                match self {
                    $(SqlState::$variant => $code,)*
                }
            }

            /// Upper-case symbolic name, as used in diagnostics.
            #[must_use]
            pub fn name(self) -> &'static str {
                match self {
                    $(SqlState::$variant => $name,)*
                }
            }

            #[must_use]
            pub fn from_code(code: &str) -> Option<SqlState> {
                match code {
                    $($code => Some(SqlState::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

sql_states! {
    TooManyResults => "0100E", "TOO_MANY_RESULTS";
    NoData => "02000", "NO_DATA";
    InvalidParameterType => "07006", "INVALID_PARAMETER_TYPE";
    ConnectionUnableToConnect => "08001", "CONNECTION_UNABLE_TO_CONNECT";
    ConnectionDoesNotExist => "08003", "CONNECTION_DOES_NOT_EXIST";
    ConnectionRejected => "08004", "CONNECTION_REJECTED";
    ConnectionFailure => "08006", "CONNECTION_FAILURE";
    ConnectionFailureDuringTransaction => "08007", "CONNECTION_FAILURE_DURING_TRANSACTION";
    ProtocolViolation => "08P01", "PROTOCOL_VIOLATION";
    CommunicationError => "08S01", "COMMUNICATION_ERROR";
    NotImplemented => "0A000", "NOT_IMPLEMENTED";
    DataError => "22000", "DATA_ERROR";
    StringDataRightTruncation => "22001", "STRING_DATA_RIGHT_TRUNCATION";
    NumericValueOutOfRange => "22003", "NUMERIC_VALUE_OUT_OF_RANGE";
    BadDatetimeFormat => "22007", "BAD_DATETIME_FORMAT";
    DatetimeOverflow => "22008", "DATETIME_OVERFLOW";
    DivisionByZero => "22012", "DIVISION_BY_ZERO";
    MostSpecificTypeDoesNotMatch => "2200G", "MOST_SPECIFIC_TYPE_DOES_NOT_MATCH";
    InvalidParameterValue => "22023", "INVALID_PARAMETER_VALUE";
    InvalidTextRepresentation => "22P02", "INVALID_TEXT_REPRESENTATION";
    NotNullViolation => "23502", "NOT_NULL_VIOLATION";
    ForeignKeyViolation => "23503", "FOREIGN_KEY_VIOLATION";
    UniqueViolation => "23505", "UNIQUE_VIOLATION";
    CheckViolation => "23514", "CHECK_VIOLATION";
    ExclusionViolation => "23P01", "EXCLUSION_VIOLATION";
    InvalidCursorState => "24000", "INVALID_CURSOR_STATE";
    TransactionStateInvalid => "25000", "TRANSACTION_STATE_INVALID";
    ActiveSqlTransaction => "25001", "ACTIVE_SQL_TRANSACTION";
    NoActiveSqlTransaction => "25P01", "NO_ACTIVE_SQL_TRANSACTION";
    InFailedSqlTransaction => "25P02", "IN_FAILED_SQL_TRANSACTION";
    InvalidSqlStatementName => "26000", "INVALID_SQL_STATEMENT_NAME";
    InvalidAuthorizationSpecification => "28000", "INVALID_AUTHORIZATION_SPECIFICATION";
    InvalidPassword => "28P01", "INVALID_PASSWORD";
    InvalidTransactionTermination => "2D000", "INVALID_TRANSACTION_TERMINATION";
    InvalidSavepointSpecification => "3B000", "INVALID_SAVEPOINT_SPECIFICATION";
    SerializationFailure => "40001", "SERIALIZATION_FAILURE";
    DeadlockDetected => "40P01", "DEADLOCK_DETECTED";
    SyntaxError => "42601", "SYNTAX_ERROR";
    InvalidName => "42602", "INVALID_NAME";
    UndefinedColumn => "42703", "UNDEFINED_COLUMN";
    UndefinedObject => "42704", "UNDEFINED_OBJECT";
    DuplicateObject => "42710", "DUPLICATE_OBJECT";
    WrongObjectType => "42809", "WRONG_OBJECT_TYPE";
    DataTypeMismatch => "42821", "DATA_TYPE_MISMATCH";
    UndefinedFunction => "42883", "UNDEFINED_FUNCTION";
    UndefinedTable => "42P01", "UNDEFINED_TABLE";
    OutOfMemory => "53200", "OUT_OF_MEMORY";
    ObjectNotInState => "55000", "OBJECT_NOT_IN_STATE";
    ObjectInUse => "55006", "OBJECT_IN_USE";
    LockNotAvailable => "55P03", "LOCK_NOT_AVAILABLE";
    QueryCanceled => "57014", "QUERY_CANCELED";
    AdminShutdown => "57P01", "ADMIN_SHUTDOWN";
    CrashShutdown => "57P02", "CRASH_SHUTDOWN";
    CannotConnectNow => "57P03", "CANNOT_CONNECT_NOW";
    IoError => "58030", "IO_ERROR";
    SystemError => "60000", "SYSTEM_ERROR";
    UnexpectedError => "99999", "UNEXPECTED_ERROR";
}

impl SqlState {
    /// The `08xxx` states that mean the session itself is gone or was never established.
    #[must_use]
    pub fn is_connection_error(self) -> bool {
        matches!(
            self,
            SqlState::ConnectionUnableToConnect
                | SqlState::ConnectionDoesNotExist
                | SqlState::ConnectionRejected
                | SqlState::ConnectionFailure
                | SqlState::ConnectionFailureDuringTransaction
        )
    }
}
