use std::sync::Arc;

use async_trait::async_trait;

use crate::command::Command;
use crate::error::SqlProviderError;
use crate::types::{DatabaseType, RowValues};

/// One live session to a backend.
///
/// Implementations are not safe for concurrent use: one operation at a time.
#[async_trait]
pub trait PhysicalConnection: Send {
    fn database_type(&self) -> DatabaseType;

    fn is_open(&self) -> bool;

    /// Open the session. Calling this on an open connection is a no-op.
    async fn open(&mut self) -> Result<(), SqlProviderError>;

    /// Close the session without issuing a rollback.
    async fn close(&mut self) -> Result<(), SqlProviderError>;

    async fn begin(&mut self) -> Result<(), SqlProviderError>;

    async fn commit(&mut self) -> Result<(), SqlProviderError>;

    async fn rollback(&mut self) -> Result<(), SqlProviderError>;

    /// Compile the command against the server, storing the handle on the command.
    async fn prepare(&mut self, command: &mut Command) -> Result<(), SqlProviderError>;

    /// Rows affected, or the backend's "no rows" sentinel for other statements.
    async fn execute_non_query(&mut self, command: &mut Command) -> Result<i64, SqlProviderError>;

    /// First column of the first row, if any.
    async fn execute_scalar(
        &mut self,
        command: &mut Command,
    ) -> Result<Option<RowValues>, SqlProviderError>;

    /// Start a forward-only cursor. The cursor borrows the connection until dropped.
    async fn execute_reader<'c>(
        &'c mut self,
        command: &mut Command,
    ) -> Result<Box<dyn RowCursor + 'c>, SqlProviderError>;

    /// Run parameterless, possibly multi-statement SQL.
    async fn execute_batch(&mut self, sql: &str) -> Result<(), SqlProviderError>;
}

/// Forward-only cursor over the first result set of a command.
#[async_trait]
pub trait RowCursor: Send {
    fn column_names(&self) -> Arc<Vec<String>>;

    /// Whether at least one row is available. Buffers the first row.
    async fn has_rows(&mut self) -> Result<bool, SqlProviderError>;

    async fn next_row(&mut self) -> Result<Option<Vec<RowValues>>, SqlProviderError>;

    /// Discard whatever remains without draining it through the caller.
    async fn close(&mut self) -> Result<(), SqlProviderError>;
}
