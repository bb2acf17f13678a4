//! Reading query results: the cursor, the current row and value coercion.

mod convert;
mod cursor;
mod result_set;
mod row;

pub use convert::FromRowValue;
pub use cursor::RowCursor;
pub use result_set::ResultSet;
pub use row::{ColumnIndex, Row, RowMap};
