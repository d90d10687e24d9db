mod result_set;
mod row;

pub use result_set::ResultSet;
pub use row::CustomDbRow;

pub(crate) use row::{ColumnIndex, build_column_index, lookup_column};
