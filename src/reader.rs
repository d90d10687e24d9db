use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::SqlProviderError;
use crate::guard::guard_io;
use crate::mapping::{MapRow, MappingMode, RowPlan};
use crate::provider::RowCursor;
use crate::results::{ColumnIndex, CustomDbRow, ResultSet, build_column_index};
use crate::types::RowValues;

/// A live, forward-only cursor over the first result set of a command.
///
/// The reader borrows the service's connection until it is dropped. Readers
/// returned by `execute_reader` are the caller's to close; dropping one without
/// closing it leaves any unread rows for the driver to discard.
pub struct DataReader<'c> {
    cursor: Box<dyn RowCursor + 'c>,
    column_names: Arc<Vec<String>>,
    column_index: ColumnIndex,
    timeout: Option<u32>,
    cancel: Option<CancellationToken>,
    mode: MappingMode,
    closed: bool,
}

impl std::fmt::Debug for DataReader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataReader")
            .field("column_names", &self.column_names)
            .field("mode", &self.mode)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl<'c> DataReader<'c> {
    pub(crate) fn new(
        cursor: Box<dyn RowCursor + 'c>,
        timeout: Option<u32>,
        cancel: Option<CancellationToken>,
        mode: MappingMode,
    ) -> Self {
        let column_names = cursor.column_names();
        let column_index = build_column_index(&column_names);
        Self {
            cursor,
            column_names,
            column_index,
            timeout,
            cancel,
            mode,
            closed: false,
        }
    }

    #[must_use]
    pub fn column_names(&self) -> &Arc<Vec<String>> {
        &self.column_names
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether the result set has at least one unread row.
    ///
    /// # Errors
    /// Returns the driver's error, `Timeout` or `Cancelled`.
    pub async fn has_rows(&mut self) -> Result<bool, SqlProviderError> {
        if self.closed {
            return Ok(false);
        }
        guard_io(self.cursor.has_rows(), self.timeout, self.cancel.as_ref()).await
    }

    async fn next_values(&mut self) -> Result<Option<Vec<RowValues>>, SqlProviderError> {
        if self.closed {
            return Ok(None);
        }
        guard_io(self.cursor.next_row(), self.timeout, self.cancel.as_ref()).await
    }

    /// Advance to the next row.
    ///
    /// # Errors
    /// Returns the driver's error, `Timeout` or `Cancelled`.
    pub async fn read(&mut self) -> Result<Option<CustomDbRow>, SqlProviderError> {
        Ok(self.next_values().await?.map(|values| {
            CustomDbRow::with_index(
                Arc::clone(&self.column_names),
                Arc::clone(&self.column_index),
                values,
            )
        }))
    }

    /// Map every remaining row into `T`.
    ///
    /// # Errors
    /// Returns read errors, or a `Mapping` error in strict mode.
    pub async fn map_all<T: MapRow>(&mut self) -> Result<Vec<T>, SqlProviderError> {
        let plan = RowPlan::<T>::new(&self.column_names, &self.column_index, self.mode);
        let mut records = Vec::new();
        while let Some(values) = self.next_values().await? {
            records.push(plan.map(&values)?);
        }
        Ok(records)
    }

    /// Map the next row into `T`, if there is one.
    ///
    /// # Errors
    /// Returns read errors, or a `Mapping` error in strict mode.
    pub async fn map_first<T: MapRow>(&mut self) -> Result<Option<T>, SqlProviderError> {
        match self.next_values().await? {
            Some(values) => {
                RowPlan::<T>::new(&self.column_names, &self.column_index, self.mode)
                    .map(&values)
                    .map(Some)
            }
            None => Ok(None),
        }
    }

    /// Read every remaining row into a snapshot.
    ///
    /// # Errors
    /// Returns the driver's error, `Timeout` or `Cancelled`.
    pub async fn to_result_set(&mut self) -> Result<ResultSet, SqlProviderError> {
        let mut result_set = ResultSet::with_capacity(16);
        result_set.set_column_names(Arc::clone(&self.column_names));
        while let Some(values) = self.next_values().await? {
            result_set.add_row_values(values);
        }
        Ok(result_set)
    }

    /// Discard the rest of the result set. Closing twice is a no-op.
    ///
    /// # Errors
    /// Returns the driver's error while discarding.
    pub async fn close(&mut self) -> Result<(), SqlProviderError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.cursor.close().await
    }
}
