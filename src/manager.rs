use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::ConnectionConfig;
use crate::error::SqlProviderError;
use crate::guard::{check_cancelled, guard_io};
use crate::provider::{PhysicalConnection, connection_for};
use crate::types::DatabaseType;

/// Lifecycle state of the managed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Open,
    InTransaction,
}

/// Handle to the manager's active transaction.
///
/// Commands carry a copy to mark that they run inside the transaction; the
/// transaction itself lives on the physical connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Transaction {
    id: u64,
    database_type: DatabaseType,
}

impl Transaction {
    pub(crate) fn new(id: u64, database_type: DatabaseType) -> Self {
        Self { id, database_type }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn database_type(&self) -> DatabaseType {
        self.database_type
    }
}

/// Owns one physical connection and at most one active transaction.
pub struct ConnectionManager {
    config: ConnectionConfig,
    connection: Box<dyn PhysicalConnection>,
    transaction: Option<Transaction>,
    next_transaction_id: u64,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("database_type", &self.config.database_type)
            .field("name", &self.config.name)
            .field("state", &self.state())
            .field("transaction", &self.transaction)
            .finish()
    }
}

impl ConnectionManager {
    /// Create a manager with a closed connection for the configured backend.
    ///
    /// # Errors
    /// Returns `UnsupportedBackend` when the backend was not compiled in.
    pub fn new(config: ConnectionConfig) -> Result<Self, SqlProviderError> {
        let connection = connection_for(&config)?;
        Ok(Self::with_connection(config, connection))
    }

    /// Create a manager over an existing physical connection.
    ///
    /// # Errors
    /// Returns `ConfigError` when the connection's backend differs from the config.
    pub fn from_connection(
        config: ConnectionConfig,
        connection: Box<dyn PhysicalConnection>,
    ) -> Result<Self, SqlProviderError> {
        if connection.database_type() != config.database_type {
            return Err(SqlProviderError::ConfigError(format!(
                "connection is {} but configuration names {}",
                connection.database_type(),
                config.database_type
            )));
        }
        Ok(Self::with_connection(config, connection))
    }

    fn with_connection(config: ConnectionConfig, connection: Box<dyn PhysicalConnection>) -> Self {
        Self {
            config,
            connection,
            transaction: None,
            next_transaction_id: 1,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    #[must_use]
    pub fn database_type(&self) -> DatabaseType {
        self.config.database_type
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        if !self.connection.is_open() {
            ConnectionState::Closed
        } else if self.transaction.is_some() {
            ConnectionState::InTransaction
        } else {
            ConnectionState::Open
        }
    }

    #[must_use]
    pub fn active_transaction(&self) -> Option<Transaction> {
        self.transaction
    }

    pub(crate) fn connection_mut(&mut self) -> &mut dyn PhysicalConnection {
        self.connection.as_mut()
    }

    /// Open the connection; a no-op when already open.
    ///
    /// # Errors
    /// Returns the driver's connect error, or `Cancelled`.
    pub async fn open(&mut self, cancel: Option<&CancellationToken>) -> Result<(), SqlProviderError> {
        if self.connection.is_open() {
            return Ok(());
        }
        debug!(backend = %self.config.database_type, name = %self.config.name, "opening connection");
        guard_io(self.connection.open(), None, cancel).await
    }

    /// Close the connection from any state.
    ///
    /// An active transaction reference is discarded without a rollback; what the
    /// server does with it is up to the driver.
    ///
    /// # Errors
    /// Returns the driver's error if closing fails.
    pub async fn close(&mut self) -> Result<(), SqlProviderError> {
        if let Some(tx) = self.transaction.take() {
            warn!(transaction = tx.id, "closing connection with an active transaction");
        }
        if !self.connection.is_open() {
            return Ok(());
        }
        debug!(backend = %self.config.database_type, name = %self.config.name, "closing connection");
        self.connection.close().await
    }

    /// Begin a transaction, opening the connection first if needed.
    ///
    /// Beginning while a transaction is active replaces the tracked reference; the
    /// predecessor is not rolled back.
    ///
    /// # Errors
    /// Returns the driver's error, or `Cancelled`.
    pub async fn begin_transaction(
        &mut self,
        cancel: Option<&CancellationToken>,
    ) -> Result<Transaction, SqlProviderError> {
        self.open(cancel).await?;

        if let Some(previous) = self.transaction {
            warn!(
                transaction = previous.id,
                "beginning a transaction while another is active; replacing it without rollback"
            );
        }

        guard_io(self.connection.begin(), None, cancel).await?;

        let tx = Transaction::new(self.next_transaction_id, self.config.database_type);
        self.next_transaction_id += 1;
        self.transaction = Some(tx);
        debug!(transaction = tx.id, "transaction started");
        Ok(tx)
    }

    /// Commit the active transaction. The reference is cleared even if the
    /// commit itself fails.
    ///
    /// # Errors
    /// Returns `NoActiveTransaction` without a prior begin, otherwise the driver's error.
    pub async fn commit_transaction(
        &mut self,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), SqlProviderError> {
        check_cancelled(cancel)?;
        let tx = self
            .transaction
            .take()
            .ok_or(SqlProviderError::NoActiveTransaction)?;
        debug!(transaction = tx.id, "committing transaction");
        guard_io(self.connection.commit(), None, cancel).await
    }

    /// Roll back the active transaction. The reference is cleared even if the
    /// rollback itself fails.
    ///
    /// # Errors
    /// Returns `NoActiveTransaction` without a prior begin, otherwise the driver's error.
    pub async fn rollback_transaction(
        &mut self,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), SqlProviderError> {
        check_cancelled(cancel)?;
        let tx = self
            .transaction
            .take()
            .ok_or(SqlProviderError::NoActiveTransaction)?;
        debug!(transaction = tx.id, "rolling back transaction");
        guard_io(self.connection.rollback(), None, cancel).await
    }
}
