use std::sync::Arc;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use futures_util::stream::BoxStream;
use tiberius::Query;
use tracing::debug;

use super::client::{MssqlClient, create_mssql_client};
use super::query::{bind_query_params, column_names, row_values};
use super::render::{ROW_COUNT_VARIABLE, RenderedBatch, render};
use crate::command::{Command, PreparedStatement};
use crate::error::SqlProviderError;
use crate::provider::{PhysicalConnection, RowCursor};
use crate::types::{DatabaseType, RowValues};

/// Rows affected reported when an output-bearing batch yields no captured
/// `@@ROWCOUNT`.
pub const UNKNOWN_ROWS_AFFECTED: i64 = -1;

/// First result set of an output-bearing batch, plus the row count captured
/// after the caller's SQL.
struct OutputRun {
    rows: Vec<tiberius::Row>,
    rows_affected: Option<i64>,
}

/// A single tiberius session opened from an ADO.NET-style connection string.
pub struct MssqlConnection {
    connection_string: String,
    client: Option<MssqlClient>,
    in_transaction: bool,
}

impl MssqlConnection {
    #[must_use]
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            client: None,
            in_transaction: false,
        }
    }

    fn client(&mut self) -> Result<&mut MssqlClient, SqlProviderError> {
        self.client
            .as_mut()
            .ok_or_else(|| SqlProviderError::ConnectionError("SQL Server connection is not open".into()))
    }

    /// SQL Server refuses commands that are not enlisted in the pending local
    /// transaction of their connection.
    fn check_enlistment(&self, command: &Command) -> Result<(), SqlProviderError> {
        if self.in_transaction && command.transaction.is_none() {
            return Err(SqlProviderError::ExecutionError(
                "the command must carry the connection's pending local transaction".into(),
            ));
        }
        Ok(())
    }

    async fn simple(&mut self, sql: &'static str) -> Result<(), SqlProviderError> {
        Query::new(sql).execute(self.client()?).await?;
        Ok(())
    }

    /// Run a batch with output variables, copying the trailing output row back
    /// into the command.
    async fn query_with_outputs(
        &mut self,
        command: &mut Command,
        batch: &RenderedBatch,
    ) -> Result<OutputRun, SqlProviderError> {
        let query = bind_query_params(batch.sql.as_str(), &command.parameters, &batch.inputs);
        let mut results = query.query(self.client()?).await?.into_results().await?;

        let mut rows_affected = None;
        if let Some(output_row) = results.pop().and_then(|mut rows| rows.pop()) {
            let names: Vec<String> = output_row.columns().iter().map(|c| c.name().to_string()).collect();
            for (name, value) in names.iter().zip(row_values(output_row)) {
                if batch.counts_rows && name == ROW_COUNT_VARIABLE {
                    rows_affected = value.as_int().copied();
                } else {
                    command.set_output(name, value);
                }
            }
        }
        Ok(OutputRun {
            rows: results.into_iter().next().unwrap_or_default(),
            rows_affected,
        })
    }
}

#[async_trait]
impl PhysicalConnection for MssqlConnection {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Mssql
    }

    fn is_open(&self) -> bool {
        self.client.is_some()
    }

    async fn open(&mut self) -> Result<(), SqlProviderError> {
        if self.client.is_some() {
            return Ok(());
        }
        self.client = Some(create_mssql_client(&self.connection_string).await?);
        self.in_transaction = false;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SqlProviderError> {
        self.in_transaction = false;
        if let Some(client) = self.client.take() {
            client.close().await?;
        }
        Ok(())
    }

    async fn begin(&mut self) -> Result<(), SqlProviderError> {
        self.simple("BEGIN TRANSACTION").await?;
        self.in_transaction = true;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), SqlProviderError> {
        self.in_transaction = false;
        self.simple("COMMIT TRANSACTION").await
    }

    async fn rollback(&mut self) -> Result<(), SqlProviderError> {
        self.in_transaction = false;
        self.simple("ROLLBACK TRANSACTION").await
    }

    /// Tiberius has no statement handle to compile ahead of time; the command is
    /// marked prepared and `sp_executesql` plan caching covers reuse.
    async fn prepare(&mut self, command: &mut Command) -> Result<(), SqlProviderError> {
        self.client()?;
        command.prepared = Some(PreparedStatement::Marker);
        Ok(())
    }

    async fn execute_non_query(&mut self, command: &mut Command) -> Result<i64, SqlProviderError> {
        self.check_enlistment(command)?;
        let batch = render(command, true);
        debug!(sql = %batch.sql, inputs = batch.inputs.len(), "mssql non-query");

        if batch.has_outputs() {
            let run = self.query_with_outputs(command, &batch).await?;
            return Ok(run.rows_affected.unwrap_or(UNKNOWN_ROWS_AFFECTED));
        }

        let query = bind_query_params(batch.sql.as_str(), &command.parameters, &batch.inputs);
        let result = query.execute(self.client()?).await?;
        let total: u64 = result.rows_affected().iter().sum();
        Ok(i64::try_from(total).unwrap_or(i64::MAX))
    }

    async fn execute_scalar(
        &mut self,
        command: &mut Command,
    ) -> Result<Option<RowValues>, SqlProviderError> {
        self.check_enlistment(command)?;
        let batch = render(command, true);

        let first_row = if batch.has_outputs() {
            self.query_with_outputs(command, &batch).await?.rows.into_iter().next()
        } else {
            let query = bind_query_params(batch.sql.as_str(), &command.parameters, &batch.inputs);
            query.query(self.client()?).await?.into_row().await?
        };
        Ok(first_row.and_then(|row| row_values(row).into_iter().next()))
    }

    async fn execute_reader<'c>(
        &'c mut self,
        command: &mut Command,
    ) -> Result<Box<dyn RowCursor + 'c>, SqlProviderError> {
        self.check_enlistment(command)?;
        let batch = render(command, false);
        let query = bind_query_params(batch.sql, &command.parameters, &batch.inputs);

        let mut stream = query.query(self.client()?).await?;
        let columns = stream
            .columns()
            .await?
            .map(column_names)
            .unwrap_or_default();
        Ok(Box::new(MssqlCursor {
            rows: Some(stream.into_row_stream()),
            columns: Arc::new(columns),
            buffered: None,
        }))
    }

    async fn execute_batch(&mut self, sql: &str) -> Result<(), SqlProviderError> {
        Query::new(sql).execute(self.client()?).await?;
        Ok(())
    }
}

/// Cursor over the first result set of a tiberius query stream.
struct MssqlCursor<'c> {
    rows: Option<BoxStream<'c, tiberius::Result<tiberius::Row>>>,
    columns: Arc<Vec<String>>,
    buffered: Option<Vec<RowValues>>,
}

impl MssqlCursor<'_> {
    async fn fetch(&mut self) -> Result<Option<Vec<RowValues>>, SqlProviderError> {
        let Some(rows) = self.rows.as_mut() else {
            return Ok(None);
        };
        match rows.try_next().await? {
            Some(row) if row.result_index() == 0 => Ok(Some(row_values(row))),
            Some(_) => {
                // past the first result set
                self.rows = None;
                Ok(None)
            }
            None => {
                self.rows = None;
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl RowCursor for MssqlCursor<'_> {
    fn column_names(&self) -> Arc<Vec<String>> {
        Arc::clone(&self.columns)
    }

    async fn has_rows(&mut self) -> Result<bool, SqlProviderError> {
        if self.buffered.is_none() {
            self.buffered = self.fetch().await?;
        }
        Ok(self.buffered.is_some())
    }

    async fn next_row(&mut self) -> Result<Option<Vec<RowValues>>, SqlProviderError> {
        if let Some(row) = self.buffered.take() {
            return Ok(Some(row));
        }
        self.fetch().await
    }

    async fn close(&mut self) -> Result<(), SqlProviderError> {
        self.buffered = None;
        if let Some(mut rows) = self.rows.take() {
            while rows.try_next().await?.is_some() {}
        }
        Ok(())
    }
}
