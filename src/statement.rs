use std::fmt;

use crate::binder::ParameterBinder;
use crate::error::DriverError;
use crate::types::RowValues;

/// Binds a statement's parameters, in marker order.
///
/// Any `Fn(&mut ParameterBinder) -> Result<(), DriverError>` qualifies.
pub trait StatementBinder {
    /// # Errors
    /// Returns [`DriverError`] if the driver rejects a value.
    fn bind(&self, binder: &mut ParameterBinder<'_>) -> Result<(), DriverError>;
}

impl<F> StatementBinder for F
where
    F: Fn(&mut ParameterBinder<'_>) -> Result<(), DriverError>,
{
    fn bind(&self, binder: &mut ParameterBinder<'_>) -> Result<(), DriverError> {
        self(binder)
    }
}

/// SQL text plus the procedure that binds its `?` markers. Accepted by every executor operation.
pub trait SqlStatement {
    fn sql(&self) -> &str;

    /// # Errors
    /// Returns [`DriverError`] if the driver rejects a value.
    fn bind_all(&self, binder: &mut ParameterBinder<'_>) -> Result<(), DriverError>;
}

/// An immutable statement: trimmed SQL text and its binder.
///
/// The number of values bound must match the markers in the text; the driver enforces that when
/// the statement runs.
pub struct Statement<'a> {
    text: String,
    binder: Option<Box<dyn StatementBinder + 'a>>,
}

impl<'a> Statement<'a> {
    /// A statement without parameters.
    #[must_use]
    pub fn new(text: impl AsRef<str>) -> Self {
        Self {
            text: text.as_ref().trim().to_string(),
            binder: None,
        }
    }

    /// A statement whose markers take `params` in order.
    pub fn with_params<I>(text: impl AsRef<str>, params: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<RowValues>,
    {
        let values: Vec<RowValues> = params.into_iter().map(Into::into).collect();
        Self::with_binder(text, move |binder| {
            for value in &values {
                binder.set(value.clone())?;
            }
            Ok(())
        })
    }

    /// A statement bound by a caller-supplied procedure.
    pub fn with_binder<F>(text: impl AsRef<str>, binder: F) -> Self
    where
        F: Fn(&mut ParameterBinder<'_>) -> Result<(), DriverError> + 'a,
    {
        Self {
            text: text.as_ref().trim().to_string(),
            binder: Some(Box::new(binder)),
        }
    }

    /// Wrap this statement with pagination.
    ///
    /// A limit above zero appends ` LIMIT ? `; an offset above zero then appends ` OFFSET ? `.
    /// Their values are bound after every caller parameter, limit first.
    ///
    /// An offset without a limit yields `... OFFSET ?`, which PostgreSQL accepts and SQLite
    /// rejects as a syntax error; pass a limit when paging on SQLite.
    #[must_use]
    pub fn page(&self, limit: Option<u32>, offset: Option<u64>) -> PagedStatement<'_, 'a> {
        PagedStatement::new(self, limit, offset)
    }
}

impl SqlStatement for Statement<'_> {
    fn sql(&self) -> &str {
        &self.text
    }

    fn bind_all(&self, binder: &mut ParameterBinder<'_>) -> Result<(), DriverError> {
        match &self.binder {
            Some(procedure) => procedure.bind(binder),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Statement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("text", &self.text)
            .field("has_binder", &self.binder.is_some())
            .finish()
    }
}

/// A [`Statement`] with optional `LIMIT` / `OFFSET` clauses appended.
#[derive(Debug)]
pub struct PagedStatement<'s, 'a> {
    base: &'s Statement<'a>,
    text: String,
    limit: u32,
    offset: u64,
}

impl<'s, 'a> PagedStatement<'s, 'a> {
    fn new(base: &'s Statement<'a>, limit: Option<u32>, offset: Option<u64>) -> Self {
        let limit = limit.unwrap_or(0);
        let offset = offset.unwrap_or(0);
        let mut text = base.text.clone();
        if limit > 0 {
            text.push_str(" LIMIT ? ");
        }
        if offset > 0 {
            text.push_str(" OFFSET ? ");
        }
        Self {
            base,
            text,
            limit,
            offset,
        }
    }

    #[must_use]
    pub fn limit(&self) -> Option<u32> {
        (self.limit > 0).then_some(self.limit)
    }

    #[must_use]
    pub fn offset(&self) -> Option<u64> {
        (self.offset > 0).then_some(self.offset)
    }
}

impl SqlStatement for PagedStatement<'_, '_> {
    fn sql(&self) -> &str {
        &self.text
    }

    fn bind_all(&self, binder: &mut ParameterBinder<'_>) -> Result<(), DriverError> {
        self.base.bind_all(binder)?;
        if self.limit > 0 {
            binder.set_int(i32::try_from(self.limit).unwrap_or(i32::MAX))?;
        }
        if self.offset > 0 {
            binder.set_long(i64::try_from(self.offset).unwrap_or(i64::MAX))?;
        }
        Ok(())
    }
}
