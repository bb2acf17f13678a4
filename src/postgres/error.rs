use std::error::Error as _;
use std::io;

use crate::error::DriverError;
use crate::state::SqlState;

impl From<postgres::Error> for DriverError {
    fn from(err: postgres::Error) -> Self {
        if let Some(db) = err.as_db_error() {
            let code = db.code().code().to_string();
            let message = db.message().to_string();
            let driver_error = if code == SqlState::QueryCanceled.code() {
                DriverError::timeout(message)
            } else {
                DriverError::new(message)
            };
            return driver_error.with_state(code).with_source(err);
        }

        let message = err.to_string();
        if err.is_closed() {
            return DriverError::new(message)
                .with_state(SqlState::ConnectionDoesNotExist.code())
                .with_source(err);
        }
        let io_kind = err
            .source()
            .and_then(|source| source.downcast_ref::<io::Error>())
            .map(io::Error::kind);
        match io_kind {
            Some(io::ErrorKind::TimedOut) => DriverError::timeout(message).with_source(err),
            Some(_) => DriverError::new(message)
                .with_state(SqlState::ConnectionFailure.code())
                .with_source(err),
            None => DriverError::new(message).with_source(err),
        }
    }
}
