// MySQL module - the MySQL / MariaDB backend over mysql_async
//
// - connection: physical session, transactions and cursors
// - params: parameter factory and wire value conversion
// - query: command rendering and result value conversion

pub mod connection;
pub mod params;
pub(crate) mod query;

use rust_decimal::Decimal;

pub use connection::MySqlConnection;
pub use params::MySqlParameterFactory;

use crate::command::Command;
use crate::config::ConnectionConfig;
use crate::error::SqlProviderError;
use crate::params::ParameterFactory;
use crate::provider::{IdentityRetriever, PhysicalConnection, Provider, ensure_backend};
use crate::types::{CommandKind, DatabaseType, RowValues};

/// Reads the generated identity straight off the executed command; the driver
/// records it from the server's OK packet.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlIdentityRetriever;

impl IdentityRetriever for MySqlIdentityRetriever {
    fn prepare_insert(
        &self,
        _command: &mut Command,
        _kind: CommandKind,
        _factory: &dyn ParameterFactory,
    ) -> Result<(), SqlProviderError> {
        Ok(())
    }

    fn identity(&self, command: &Command) -> Option<RowValues> {
        command.last_insert_id().map(|id| {
            i64::try_from(id)
                .map(RowValues::Int)
                .unwrap_or_else(|_| RowValues::Decimal(Decimal::from(id)))
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlProvider;

impl Provider for MySqlProvider {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::MySql
    }

    fn create_connection(
        &self,
        config: &ConnectionConfig,
    ) -> Result<Box<dyn PhysicalConnection>, SqlProviderError> {
        ensure_backend(DatabaseType::MySql, config)?;
        Ok(Box::new(MySqlConnection::new(config.connection_string.clone())))
    }

    fn parameter_factory(&self) -> &dyn ParameterFactory {
        &MySqlParameterFactory
    }

    fn identity_retriever(&self) -> &dyn IdentityRetriever {
        &MySqlIdentityRetriever
    }
}
