//! Synchronous facade over the async engine.
//!
//! Each blocking service owns a current-thread tokio runtime and drives the async
//! [`crate::service::SqlService`] on it. Do not call these methods from inside an
//! async context; tokio refuses to block a runtime worker.
//!
//! The one behavioral difference from the async API: [`SqlService::select`]
//! fails with `NoRows` when the query returns nothing.

use tokio::runtime::{Builder, Runtime};
use tokio_util::sync::CancellationToken;

use crate::command::{Command, CommandOptions};
use crate::config::ConnectionConfig;
use crate::error::SqlProviderError;
use crate::manager::{ConnectionState, Transaction};
use crate::mapping::{MapRow, MappingMode};
use crate::params::{Parameter, ParameterFactory};
use crate::provider::PhysicalConnection;
use crate::reader::DataReader;
use crate::results::{CustomDbRow, ResultSet};
use crate::service::{self, InsertResult};
use crate::types::{DatabaseType, DbType, ParameterDirection, RowValues};

fn current_thread_runtime() -> Result<Runtime, SqlProviderError> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| SqlProviderError::ConfigError(format!("failed to start runtime: {e}")))
}

/// Blocking counterpart of [`crate::service::SqlService`].
pub struct SqlService {
    runtime: Runtime,
    inner: service::SqlService,
}

impl std::fmt::Debug for SqlService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("blocking::SqlService")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl SqlService {
    /// # Errors
    /// Returns `UnsupportedBackend` when the backend was not compiled in, or
    /// `ConfigError` when the runtime cannot start.
    pub fn new(config: ConnectionConfig) -> Result<Self, SqlProviderError> {
        Ok(Self {
            runtime: current_thread_runtime()?,
            inner: service::SqlService::new(config)?,
        })
    }

    /// # Errors
    /// As [`crate::service::SqlService::from_connection`], or `ConfigError` when
    /// the runtime cannot start.
    pub fn from_connection(
        config: ConnectionConfig,
        connection: Box<dyn PhysicalConnection>,
    ) -> Result<Self, SqlProviderError> {
        Ok(Self {
            runtime: current_thread_runtime()?,
            inner: service::SqlService::from_connection(config, connection)?,
        })
    }

    #[must_use]
    pub fn with_mapping_mode(mut self, mode: MappingMode) -> Self {
        self.inner = self.inner.with_mapping_mode(mode);
        self
    }

    /// The async service this facade drives.
    #[must_use]
    pub fn inner(&self) -> &service::SqlService {
        &self.inner
    }

    #[must_use]
    pub fn database_type(&self) -> DatabaseType {
        self.inner.database_type()
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.state()
    }

    #[must_use]
    pub fn parameter_factory(&self) -> &'static dyn ParameterFactory {
        self.inner.parameter_factory()
    }

    #[must_use]
    pub fn create_input_parameter(
        &self,
        name: &str,
        value: RowValues,
        db_type: DbType,
        nullable: bool,
    ) -> Parameter {
        self.inner
            .create_input_parameter(name, value, db_type, nullable)
    }

    #[must_use]
    pub fn create_output_parameter(&self, name: &str, db_type: DbType, nullable: bool) -> Parameter {
        self.inner.create_output_parameter(name, db_type, nullable)
    }

    #[must_use]
    pub fn create_parameter(
        &self,
        name: &str,
        value: RowValues,
        db_type: DbType,
        direction: ParameterDirection,
        nullable: bool,
    ) -> Parameter {
        self.inner
            .create_parameter(name, value, db_type, direction, nullable)
    }

    #[must_use]
    pub fn create_empty_parameter(&self) -> Parameter {
        self.inner.create_empty_parameter()
    }

    /// # Errors
    /// Returns the driver's connect error, or `Cancelled`.
    pub fn open(&mut self, cancel: Option<&CancellationToken>) -> Result<(), SqlProviderError> {
        self.runtime.block_on(self.inner.open(cancel))
    }

    /// # Errors
    /// Returns the driver's error if closing fails.
    pub fn close(&mut self) -> Result<(), SqlProviderError> {
        self.runtime.block_on(self.inner.close())
    }

    /// # Errors
    /// Returns the driver's error, or `Cancelled`.
    pub fn begin_transaction(
        &mut self,
        cancel: Option<&CancellationToken>,
    ) -> Result<Transaction, SqlProviderError> {
        self.runtime.block_on(self.inner.begin_transaction(cancel))
    }

    /// # Errors
    /// Returns `NoActiveTransaction` without a prior begin, otherwise the driver's error.
    pub fn commit_transaction(
        &mut self,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), SqlProviderError> {
        self.runtime.block_on(self.inner.commit_transaction(cancel))
    }

    /// # Errors
    /// Returns `NoActiveTransaction` without a prior begin, otherwise the driver's error.
    pub fn rollback_transaction(
        &mut self,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), SqlProviderError> {
        self.runtime.block_on(self.inner.rollback_transaction(cancel))
    }

    /// # Errors
    /// As [`crate::service::SqlService::create_command`].
    pub fn create_command(
        &mut self,
        sql: &str,
        parameters: Vec<Parameter>,
        options: &CommandOptions,
    ) -> Result<Command, SqlProviderError> {
        self.runtime
            .block_on(self.inner.create_command(sql, parameters, options))
    }

    /// # Errors
    /// As [`crate::service::SqlService::execute_command`].
    pub fn execute_command(&mut self, command: &mut Command) -> Result<i64, SqlProviderError> {
        self.runtime.block_on(self.inner.execute_command(command))
    }

    /// # Errors
    /// Returns the driver's error, `Timeout` or `Cancelled`.
    pub fn execute_non_query(
        &mut self,
        sql: &str,
        parameters: Vec<Parameter>,
        options: &CommandOptions,
    ) -> Result<i64, SqlProviderError> {
        self.runtime
            .block_on(self.inner.execute_non_query(sql, parameters, options))
    }

    /// # Errors
    /// Returns the driver's error, `Timeout` or `Cancelled`.
    pub fn execute_scalar(
        &mut self,
        sql: &str,
        parameters: Vec<Parameter>,
        options: &CommandOptions,
    ) -> Result<Option<RowValues>, SqlProviderError> {
        self.runtime
            .block_on(self.inner.execute_scalar(sql, parameters, options))
    }

    /// # Errors
    /// Returns the driver's error, `Timeout` or `Cancelled`.
    pub fn execute_reader(
        &mut self,
        sql: &str,
        parameters: Vec<Parameter>,
        options: &CommandOptions,
    ) -> Result<BlockingDataReader<'_>, SqlProviderError> {
        let reader = self
            .runtime
            .block_on(self.inner.execute_reader(sql, parameters, options))?;
        Ok(BlockingDataReader {
            runtime: &self.runtime,
            reader,
        })
    }

    /// # Errors
    /// Returns the driver's error, `Timeout` or `Cancelled`.
    pub fn execute_table(
        &mut self,
        sql: &str,
        parameters: Vec<Parameter>,
        options: &CommandOptions,
    ) -> Result<ResultSet, SqlProviderError> {
        self.runtime
            .block_on(self.inner.execute_table(sql, parameters, options))
    }

    /// # Errors
    /// Returns the driver's error or `Cancelled`.
    pub fn execute_batch(
        &mut self,
        sql: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), SqlProviderError> {
        self.runtime.block_on(self.inner.execute_batch(sql, cancel))
    }

    /// Map every row into `T`.
    ///
    /// # Errors
    /// Returns `NoRows` when the query returns nothing, otherwise as
    /// [`crate::service::SqlService::select`].
    pub fn select<T: MapRow>(
        &mut self,
        sql: &str,
        parameters: Vec<Parameter>,
        options: &CommandOptions,
    ) -> Result<Vec<T>, SqlProviderError> {
        self.runtime
            .block_on(self.inner.select_strict::<T>(sql, parameters, options))
    }

    /// # Errors
    /// Returns `NoRows` when the query returns nothing.
    pub fn select_first<T: MapRow>(
        &mut self,
        sql: &str,
        parameters: Vec<Parameter>,
        options: &CommandOptions,
    ) -> Result<T, SqlProviderError> {
        self.runtime
            .block_on(self.inner.select_first::<T>(sql, parameters, options))
    }

    /// # Errors
    /// Never fails for the no-rows case.
    pub fn select_first_or_default<T: MapRow>(
        &mut self,
        sql: &str,
        parameters: Vec<Parameter>,
        options: &CommandOptions,
    ) -> Result<T, SqlProviderError> {
        self.runtime.block_on(
            self.inner
                .select_first_or_default::<T>(sql, parameters, options),
        )
    }

    /// # Errors
    /// As [`crate::service::SqlService::execute_insert`].
    pub fn execute_insert(
        &mut self,
        sql: &str,
        parameters: Vec<Parameter>,
        options: &CommandOptions,
    ) -> Result<InsertResult, SqlProviderError> {
        self.runtime
            .block_on(self.inner.execute_insert(sql, parameters, options))
    }

    /// # Errors
    /// As [`crate::service::SqlService::execute_text_insert`].
    pub fn execute_text_insert<T: MapRow>(
        &mut self,
        item: &T,
        table_name: &str,
        options: &CommandOptions,
    ) -> Result<InsertResult, SqlProviderError> {
        self.runtime
            .block_on(self.inner.execute_text_insert(item, table_name, options))
    }

    /// # Errors
    /// As [`crate::service::SqlService::execute_text_insert_params`].
    pub fn execute_text_insert_params(
        &mut self,
        table_name: &str,
        parameters: Vec<Parameter>,
        options: &CommandOptions,
    ) -> Result<InsertResult, SqlProviderError> {
        self.runtime.block_on(
            self.inner
                .execute_text_insert_params(table_name, parameters, options),
        )
    }
}

/// Blocking view of a [`DataReader`]; the caller closes it.
pub struct BlockingDataReader<'s> {
    runtime: &'s Runtime,
    reader: DataReader<'s>,
}

impl BlockingDataReader<'_> {
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        self.reader.column_names()
    }

    /// # Errors
    /// Returns the driver's error, `Timeout` or `Cancelled`.
    pub fn has_rows(&mut self) -> Result<bool, SqlProviderError> {
        self.runtime.block_on(self.reader.has_rows())
    }

    /// # Errors
    /// Returns the driver's error, `Timeout` or `Cancelled`.
    pub fn read(&mut self) -> Result<Option<CustomDbRow>, SqlProviderError> {
        self.runtime.block_on(self.reader.read())
    }

    /// # Errors
    /// Returns read errors, or a strict-mode `Mapping` error.
    pub fn map_all<T: MapRow>(&mut self) -> Result<Vec<T>, SqlProviderError> {
        self.runtime.block_on(self.reader.map_all::<T>())
    }

    /// # Errors
    /// Returns read errors, or a strict-mode `Mapping` error.
    pub fn map_first<T: MapRow>(&mut self) -> Result<Option<T>, SqlProviderError> {
        self.runtime.block_on(self.reader.map_first::<T>())
    }

    /// # Errors
    /// Returns the driver's error while discarding.
    pub fn close(&mut self) -> Result<(), SqlProviderError> {
        self.runtime.block_on(self.reader.close())
    }
}
