use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::command::{Command, PreparedStatement};
use crate::error::SqlProviderError;
use crate::manager::Transaction;
use crate::params::Parameter;
use crate::provider::{PhysicalConnection, RowCursor};
use crate::types::{CommandKind, DatabaseType, RowValues};

/// What the mock answers to the next execute call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MockResponse {
    pub rows_affected: i64,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<RowValues>>,
    /// Written into the command's output parameters by name.
    pub outputs: Vec<(String, RowValues)>,
    pub last_insert_id: Option<u64>,
    pub error: Option<String>,
    pub delay: Option<Duration>,
}

impl MockResponse {
    #[must_use]
    pub fn rows_affected(rows_affected: i64) -> Self {
        Self {
            rows_affected,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn table(columns: &[&str], rows: Vec<Vec<RowValues>>) -> Self {
        Self {
            columns: columns.iter().map(ToString::to_string).collect(),
            rows,
            ..Self::default()
        }
    }

    /// The execute call fails with `ExecutionError(message)`.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_outputs(mut self, outputs: Vec<(&str, RowValues)>) -> Self {
        self.outputs = outputs
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect();
        self
    }

    #[must_use]
    pub fn with_last_insert_id(mut self, id: u64) -> Self {
        self.last_insert_id = Some(id);
        self
    }

    /// Sleep before answering, to exercise timeouts and cancellation.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// A command as the connection saw it when it ran.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedCommand {
    pub sql: String,
    pub parameters: Vec<Parameter>,
    pub kind: CommandKind,
    pub timeout: Option<u32>,
    pub prepared: bool,
    pub transaction: Option<Transaction>,
}

impl From<&Command> for ExecutedCommand {
    fn from(command: &Command) -> Self {
        Self {
            sql: command.sql.clone(),
            parameters: command.parameters.clone(),
            kind: command.kind,
            timeout: command.timeout,
            prepared: command.is_prepared(),
            transaction: command.transaction,
        }
    }
}

/// Everything the mock connection was asked to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum MockEvent {
    Open,
    Close,
    Begin,
    Commit,
    Rollback,
    /// Recorded with the command's kind and timeout at prepare time.
    Prepare(ExecutedCommand),
    NonQuery(ExecutedCommand),
    Scalar(ExecutedCommand),
    Reader(ExecutedCommand),
    ReaderClosed,
    Batch(String),
}

#[derive(Debug, Default)]
struct MockState {
    open: bool,
    fail_open: Option<String>,
    responses: VecDeque<MockResponse>,
    events: Vec<MockEvent>,
}

/// Shared view of a [`MockConnection`], kept by the test after the connection
/// itself is handed to a service.
#[derive(Debug, Clone, Default)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockHandle {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue the answer for the next execute call.
    pub fn push_response(&self, response: MockResponse) {
        self.lock().responses.push_back(response);
    }

    /// Make the next `open` fail with `ConnectionError(message)`.
    pub fn fail_next_open(&self, message: impl Into<String>) {
        self.lock().fail_open = Some(message.into());
    }

    #[must_use]
    pub fn events(&self) -> Vec<MockEvent> {
        self.lock().events.clone()
    }

    /// Commands that reached an execute call, in order.
    #[must_use]
    pub fn executed(&self) -> Vec<ExecutedCommand> {
        self.lock()
            .events
            .iter()
            .filter_map(|event| match event {
                MockEvent::NonQuery(c) | MockEvent::Scalar(c) | MockEvent::Reader(c) => {
                    Some(c.clone())
                }
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn count(&self, wanted: &MockEvent) -> usize {
        self.lock().events.iter().filter(|e| *e == wanted).count()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    fn record(&self, event: MockEvent) {
        self.lock().events.push(event);
    }

    fn next_response(&self) -> MockResponse {
        self.lock().responses.pop_front().unwrap_or_default()
    }
}

/// A scripted [`PhysicalConnection`] for exercising the engine without a server.
///
/// Responses are consumed in order by the execute calls; with the queue empty
/// every call succeeds with zero rows.
#[derive(Debug)]
pub struct MockConnection {
    database_type: DatabaseType,
    handle: MockHandle,
}

impl MockConnection {
    #[must_use]
    pub fn new(database_type: DatabaseType) -> Self {
        Self {
            database_type,
            handle: MockHandle::default(),
        }
    }

    #[must_use]
    pub fn handle(&self) -> MockHandle {
        self.handle.clone()
    }

    fn ensure_open(&self) -> Result<(), SqlProviderError> {
        if self.handle.is_open() {
            Ok(())
        } else {
            Err(SqlProviderError::ConnectionError("mock connection is not open".into()))
        }
    }

    async fn respond(&self, command: &mut Command) -> Result<MockResponse, SqlProviderError> {
        let response = self.handle.next_response();
        if let Some(delay) = response.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &response.error {
            return Err(SqlProviderError::ExecutionError(message.clone()));
        }
        for (name, value) in &response.outputs {
            command.set_output(name, value.clone());
        }
        command.last_insert_id = response.last_insert_id;
        Ok(response)
    }
}

#[async_trait]
impl PhysicalConnection for MockConnection {
    fn database_type(&self) -> DatabaseType {
        self.database_type
    }

    fn is_open(&self) -> bool {
        self.handle.is_open()
    }

    async fn open(&mut self) -> Result<(), SqlProviderError> {
        let mut state = self.handle.lock();
        if let Some(message) = state.fail_open.take() {
            return Err(SqlProviderError::ConnectionError(message));
        }
        state.open = true;
        state.events.push(MockEvent::Open);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SqlProviderError> {
        let mut state = self.handle.lock();
        state.open = false;
        state.events.push(MockEvent::Close);
        Ok(())
    }

    async fn begin(&mut self) -> Result<(), SqlProviderError> {
        self.ensure_open()?;
        self.handle.record(MockEvent::Begin);
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), SqlProviderError> {
        self.ensure_open()?;
        self.handle.record(MockEvent::Commit);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), SqlProviderError> {
        self.ensure_open()?;
        self.handle.record(MockEvent::Rollback);
        Ok(())
    }

    async fn prepare(&mut self, command: &mut Command) -> Result<(), SqlProviderError> {
        self.ensure_open()?;
        self.handle
            .record(MockEvent::Prepare(ExecutedCommand::from(&*command)));
        command.prepared = Some(PreparedStatement::Marker);
        Ok(())
    }

    async fn execute_non_query(&mut self, command: &mut Command) -> Result<i64, SqlProviderError> {
        self.ensure_open()?;
        self.handle
            .record(MockEvent::NonQuery(ExecutedCommand::from(&*command)));
        Ok(self.respond(command).await?.rows_affected)
    }

    async fn execute_scalar(
        &mut self,
        command: &mut Command,
    ) -> Result<Option<RowValues>, SqlProviderError> {
        self.ensure_open()?;
        self.handle
            .record(MockEvent::Scalar(ExecutedCommand::from(&*command)));
        let response = self.respond(command).await?;
        Ok(response
            .rows
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next()))
    }

    async fn execute_reader<'c>(
        &'c mut self,
        command: &mut Command,
    ) -> Result<Box<dyn RowCursor + 'c>, SqlProviderError> {
        self.ensure_open()?;
        self.handle
            .record(MockEvent::Reader(ExecutedCommand::from(&*command)));
        let response = self.respond(command).await?;
        Ok(Box::new(MockCursor {
            columns: Arc::new(response.columns),
            rows: response.rows.into(),
            handle: self.handle.clone(),
        }))
    }

    async fn execute_batch(&mut self, sql: &str) -> Result<(), SqlProviderError> {
        self.ensure_open()?;
        self.handle.record(MockEvent::Batch(sql.to_string()));
        Ok(())
    }
}

struct MockCursor {
    columns: Arc<Vec<String>>,
    rows: VecDeque<Vec<RowValues>>,
    handle: MockHandle,
}

#[async_trait]
impl RowCursor for MockCursor {
    fn column_names(&self) -> Arc<Vec<String>> {
        Arc::clone(&self.columns)
    }

    async fn has_rows(&mut self) -> Result<bool, SqlProviderError> {
        Ok(!self.rows.is_empty())
    }

    async fn next_row(&mut self) -> Result<Option<Vec<RowValues>>, SqlProviderError> {
        Ok(self.rows.pop_front())
    }

    async fn close(&mut self) -> Result<(), SqlProviderError> {
        self.rows.clear();
        self.handle.record(MockEvent::ReaderClosed);
        Ok(())
    }
}
