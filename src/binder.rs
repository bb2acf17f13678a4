use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::driver::PreparedHandle;
use crate::error::DriverError;
use crate::types::RowValues;

/// Assigns parameters to a prepared statement in order.
///
/// Each setter takes the next 1-based position and hands the value to the driver straight away.
/// There is no random access and no rebinding; a binder lives for one execution of one statement.
///
/// ```rust,no_run
/// # use sql_access::prelude::*;
/// let stmt = Statement::with_binder("UPDATE book SET in_stock = ? WHERE title = ?", |b| {
///     b.set_bool(false)?.set_string("Alpha")?;
///     Ok(())
/// });
/// # let _ = stmt;
/// ```
pub struct ParameterBinder<'h> {
    handle: &'h mut dyn PreparedHandle,
    position: usize,
}

macro_rules! typed_setters {
    ($($name:ident($ty:ty)),* $(,)?) => {
        $(
            #[doc = concat!("Bind a `", stringify!($ty), "` at the next position.")]
            ///
            /// # Errors
            /// Returns [`DriverError`] if the driver rejects the value.
            pub fn $name(&mut self, value: $ty) -> Result<&mut Self, DriverError> {
                self.set(value)
            }
        )*
    };
}

impl<'h> ParameterBinder<'h> {
    pub(crate) fn new(handle: &'h mut dyn PreparedHandle) -> Self {
        Self {
            handle,
            position: 0,
        }
    }

    /// Number of parameters bound so far, which is also the last position used.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Bind any value convertible to [`RowValues`]; `None` binds NULL.
    ///
    /// # Errors
    /// Returns [`DriverError`] if the driver rejects the value.
    pub fn set(&mut self, value: impl Into<RowValues>) -> Result<&mut Self, DriverError> {
        self.position += 1;
        self.handle.bind(self.position, value.into())?;
        Ok(self)
    }

    /// Bind an SQL NULL at the next position.
    ///
    /// # Errors
    /// Returns [`DriverError`] if the driver rejects the value.
    pub fn set_null(&mut self) -> Result<&mut Self, DriverError> {
        self.set(RowValues::Null)
    }

    /// Bind text at the next position.
    ///
    /// # Errors
    /// Returns [`DriverError`] if the driver rejects the value.
    pub fn set_string(&mut self, value: &str) -> Result<&mut Self, DriverError> {
        self.set(value)
    }

    typed_setters! {
        set_uuid(Uuid),
        set_short(i16),
        set_int(i32),
        set_long(i64),
        set_double(f64),
        set_decimal(Decimal),
        set_bool(bool),
        set_date(NaiveDate),
        set_date_time(NaiveDateTime),
    }
}
