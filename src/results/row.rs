use std::collections::HashMap;
use std::sync::Arc;

use crate::types::RowValues;

/// Lower-cased column name to ordinal; the first occurrence of a name wins.
pub(crate) type ColumnIndex = Arc<HashMap<String, usize>>;

pub(crate) fn build_column_index(column_names: &[String]) -> ColumnIndex {
    let mut index = HashMap::with_capacity(column_names.len());
    for (i, name) in column_names.iter().enumerate() {
        index.entry(name.to_lowercase()).or_insert(i);
    }
    Arc::new(index)
}

/// Exact match first, then the case-insensitive index.
pub(crate) fn lookup_column(
    column_names: &[String],
    index: &ColumnIndex,
    column_name: &str,
) -> Option<usize> {
    column_names
        .iter()
        .position(|col| col == column_name)
        .or_else(|| index.get(&column_name.to_lowercase()).copied())
}

/// A row from a database query result
///
/// This struct represents a single row from a database query result,
/// with access to both the column names and the values.
#[derive(Debug, Clone)]
pub struct CustomDbRow {
    /// The column names for this row (shared across all rows in a result set)
    pub column_names: Arc<Vec<String>>,
    /// The values for this row
    pub rows: Vec<RowValues>,
    #[doc(hidden)]
    pub(crate) column_index_cache: ColumnIndex,
}

impl CustomDbRow {
    /// Create a new database row
    ///
    /// # Arguments
    ///
    /// * `column_names` - The column names
    /// * `rows` - The values for this row
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, rows: Vec<RowValues>) -> Self {
        let cache = build_column_index(&column_names);
        Self::with_index(column_names, cache, rows)
    }

    pub(crate) fn with_index(
        column_names: Arc<Vec<String>>,
        column_index_cache: ColumnIndex,
        rows: Vec<RowValues>,
    ) -> Self {
        Self {
            column_names,
            rows,
            column_index_cache,
        }
    }

    /// Get the index of a column by name.
    ///
    /// An exact match wins; otherwise the comparison is case-insensitive, matching
    /// how both backends compare column names.
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        lookup_column(&self.column_names, &self.column_index_cache, column_name)
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.get_column_index(column_name)
            .and_then(|idx| self.rows.get(idx))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.rows.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
