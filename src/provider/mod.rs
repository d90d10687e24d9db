//! Backend capability set and the registry that selects it.
//!
//! Each backend implements [`Provider`] once: connection construction, parameter
//! construction and generated-identity retrieval. Everything above this module
//! dispatches through the trait instead of matching on [`DatabaseType`].

mod connection;

pub use connection::{PhysicalConnection, RowCursor};

use crate::command::Command;
use crate::config::ConnectionConfig;
use crate::error::SqlProviderError;
use crate::params::{Parameter, ParameterFactory};
use crate::types::{CommandKind, DatabaseType, RowValues};

/// How a backend recovers the identity generated by an insert.
pub trait IdentityRetriever: Send + Sync {
    /// Adjust the command before it is prepared or run (attach outputs, extend
    /// the SQL). `kind` is the kind the command will execute as; it is not yet
    /// set on the command at this point.
    ///
    /// # Errors
    /// Returns `ParameterError` when caller parameters collide with names the
    /// protocol reserves.
    fn prepare_insert(
        &self,
        command: &mut Command,
        kind: CommandKind,
        factory: &dyn ParameterFactory,
    ) -> Result<(), SqlProviderError>;

    /// Identity value after the command ran, if the backend produced one.
    fn identity(&self, command: &Command) -> Option<RowValues>;

    /// Rows affected as the protocol sees them; defaults to the driver's count.
    fn rows_affected(&self, _command: &Command, reported: i64) -> i64 {
        reported
    }
}

/// Constructors for one backend.
pub trait Provider: Send + Sync {
    fn database_type(&self) -> DatabaseType;

    /// A closed physical connection for `config`.
    ///
    /// # Errors
    /// Returns an error when the configuration names a different backend.
    fn create_connection(
        &self,
        config: &ConnectionConfig,
    ) -> Result<Box<dyn PhysicalConnection>, SqlProviderError>;

    fn parameter_factory(&self) -> &dyn ParameterFactory;

    fn identity_retriever(&self) -> &dyn IdentityRetriever;

    fn create_command(&self, sql: &str) -> Command {
        Command::new(self.database_type(), sql)
    }
}

#[cfg(feature = "mysql")]
static MYSQL: crate::mysql::MySqlProvider = crate::mysql::MySqlProvider;

#[cfg(feature = "mssql")]
static MSSQL: crate::mssql::MssqlProvider = crate::mssql::MssqlProvider;

/// Select the capability set for a backend.
///
/// # Errors
/// Returns `UnsupportedBackend` when the backend was not compiled in.
pub fn provider_for(database_type: DatabaseType) -> Result<&'static dyn Provider, SqlProviderError> {
    match database_type {
        #[cfg(feature = "mysql")]
        DatabaseType::MySql => Ok(&MYSQL),
        #[cfg(feature = "mssql")]
        DatabaseType::Mssql => Ok(&MSSQL),
        #[allow(unreachable_patterns)]
        other => Err(SqlProviderError::UnsupportedBackend(other.to_string())),
    }
}

/// A closed physical connection for the configured backend.
///
/// # Errors
/// Returns `UnsupportedBackend` when the backend was not compiled in.
pub fn connection_for(
    config: &ConnectionConfig,
) -> Result<Box<dyn PhysicalConnection>, SqlProviderError> {
    provider_for(config.database_type)?.create_connection(config)
}

/// An empty command for the backend.
///
/// # Errors
/// Returns `UnsupportedBackend` when the backend was not compiled in.
pub fn command_for(database_type: DatabaseType) -> Result<Command, SqlProviderError> {
    Ok(provider_for(database_type)?.create_command(""))
}

/// An empty parameter for the backend.
///
/// # Errors
/// Returns `UnsupportedBackend` when the backend was not compiled in.
pub fn parameter_for(database_type: DatabaseType) -> Result<Parameter, SqlProviderError> {
    Ok(provider_for(database_type)?
        .parameter_factory()
        .create_empty_parameter())
}

pub(crate) fn ensure_backend(
    expected: DatabaseType,
    config: &ConnectionConfig,
) -> Result<(), SqlProviderError> {
    if config.database_type == expected {
        Ok(())
    } else {
        Err(SqlProviderError::ConfigError(format!(
            "{expected} provider cannot open a {} connection",
            config.database_type
        )))
    }
}
