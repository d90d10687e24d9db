// MSSQL module - the SQL Server backend over tiberius
//
// - client: raw client creation from an ADO.NET connection string
// - connection: physical session, transactions and cursors
// - params: parameter factory and native type names
// - query: value binding and result extraction
// - render: command to T-SQL batch rendering

pub mod client;
pub mod connection;
pub mod params;
pub(crate) mod query;
pub(crate) mod render;

pub use client::{MssqlClient, create_mssql_client};
pub use connection::{MssqlConnection, UNKNOWN_ROWS_AFFECTED};
pub use params::MssqlParameterFactory;

use crate::command::Command;
use crate::config::ConnectionConfig;
use crate::error::SqlProviderError;
use crate::params::ParameterFactory;
use crate::provider::{IdentityRetriever, PhysicalConnection, Provider, ensure_backend};
use crate::types::{CommandKind, DatabaseType, DbType, RowValues};

/// Output parameter receiving `SCOPE_IDENTITY()` on inserts.
pub const RETURNED_ID_PARAMETER: &str = "@ReturnedId";

/// Output parameter receiving `@@ROWCOUNT` on inserts.
pub const ROWS_AFFECTED_PARAMETER: &str = "@RowsAffected";

/// SQL Server reports the session identity through T-SQL, so the insert is
/// extended with a trailing assignment into two reserved output parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct MssqlIdentityRetriever;

impl IdentityRetriever for MssqlIdentityRetriever {
    fn prepare_insert(
        &self,
        command: &mut Command,
        kind: CommandKind,
        factory: &dyn ParameterFactory,
    ) -> Result<(), SqlProviderError> {
        for reserved in [RETURNED_ID_PARAMETER, ROWS_AFFECTED_PARAMETER] {
            if command.parameter(reserved).is_some() {
                return Err(SqlProviderError::ParameterError(format!(
                    "`{reserved}` is reserved for identity retrieval"
                )));
            }
        }
        if kind == CommandKind::StoredProcedure {
            return Ok(());
        }

        let body = command.sql.trim_end().trim_end_matches(';').trim_end();
        command.sql = format!(
            "{body}\n;SELECT {ROWS_AFFECTED_PARAMETER} = @@ROWCOUNT, {RETURNED_ID_PARAMETER} = SCOPE_IDENTITY()"
        );
        command.parameters.push(factory.create_output_parameter(
            RETURNED_ID_PARAMETER,
            DbType::Int64,
            true,
        ));
        command.parameters.push(factory.create_output_parameter(
            ROWS_AFFECTED_PARAMETER,
            DbType::Int32,
            true,
        ));
        Ok(())
    }

    fn identity(&self, command: &Command) -> Option<RowValues> {
        command
            .output_value(RETURNED_ID_PARAMETER)
            .filter(|v| !v.is_null())
            .cloned()
    }

    fn rows_affected(&self, command: &Command, reported: i64) -> i64 {
        command
            .output_value(ROWS_AFFECTED_PARAMETER)
            .and_then(RowValues::as_int)
            .copied()
            .unwrap_or(reported)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MssqlProvider;

impl Provider for MssqlProvider {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Mssql
    }

    fn create_connection(
        &self,
        config: &ConnectionConfig,
    ) -> Result<Box<dyn PhysicalConnection>, SqlProviderError> {
        ensure_backend(DatabaseType::Mssql, config)?;
        Ok(Box::new(MssqlConnection::new(config.connection_string.clone())))
    }

    fn parameter_factory(&self) -> &dyn ParameterFactory {
        &MssqlParameterFactory
    }

    fn identity_retriever(&self) -> &dyn IdentityRetriever {
        &MssqlIdentityRetriever
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mssql::render::render;

    fn insert_command() -> Command {
        let mut cmd = Command::new(DatabaseType::Mssql, "INSERT INTO t(name) VALUES(@n);  ");
        cmd.parameters = vec![MssqlParameterFactory.create_input_parameter(
            "@n",
            RowValues::Text("a".into()),
            DbType::String,
            true,
        )];
        cmd
    }

    #[test]
    fn insert_is_extended_with_identity_outputs() {
        let mut cmd = insert_command();
        MssqlIdentityRetriever
            .prepare_insert(&mut cmd, CommandKind::Text, &MssqlParameterFactory)
            .unwrap();
        assert_eq!(cmd.parameters.len(), 3);

        let batch = render(&cmd, true);
        assert_eq!(
            batch.sql,
            "DECLARE @ReturnedId BIGINT;\nDECLARE @RowsAffected INT;\nDECLARE @__RowCount INT;\n\
             INSERT INTO t(name) VALUES(@P1)\n\
             ;SELECT @RowsAffected = @@ROWCOUNT, @ReturnedId = SCOPE_IDENTITY();\n\
             SET @__RowCount = @@ROWCOUNT;\n\
             SELECT @ReturnedId AS [ReturnedId], @RowsAffected AS [RowsAffected], @__RowCount AS [__RowCount];"
        );
        assert_eq!(batch.inputs, vec![0]);
    }

    #[test]
    fn trailing_line_comment_does_not_hide_identity_clause() {
        let mut cmd = Command::new(DatabaseType::Mssql, "INSERT INTO t(name) VALUES(@n) -- new row");
        cmd.parameters = vec![MssqlParameterFactory.create_input_parameter(
            "@n",
            RowValues::Text("a".into()),
            DbType::String,
            true,
        )];
        MssqlIdentityRetriever
            .prepare_insert(&mut cmd, CommandKind::Text, &MssqlParameterFactory)
            .unwrap();

        let batch = render(&cmd, true);
        let assignment = batch
            .sql
            .lines()
            .find(|line| line.contains("SCOPE_IDENTITY()"))
            .unwrap();
        assert!(assignment.starts_with(";SELECT @RowsAffected = @@ROWCOUNT"));
        assert!(!assignment.contains("--"));
        assert!(batch.sql.contains("VALUES(@P1) -- new row\n"));
    }

    #[test]
    fn identity_and_rows_come_from_outputs() {
        let mut cmd = insert_command();
        MssqlIdentityRetriever
            .prepare_insert(&mut cmd, CommandKind::Text, &MssqlParameterFactory)
            .unwrap();
        assert_eq!(MssqlIdentityRetriever.identity(&cmd), None);
        assert_eq!(MssqlIdentityRetriever.rows_affected(&cmd, -1), -1);

        cmd.set_output("ReturnedId", RowValues::Int(42));
        cmd.set_output("RowsAffected", RowValues::Int(1));
        assert_eq!(MssqlIdentityRetriever.identity(&cmd), Some(RowValues::Int(42)));
        assert_eq!(MssqlIdentityRetriever.rows_affected(&cmd, -1), 1);
    }

    #[test]
    fn reserved_names_collide() {
        let mut cmd = insert_command();
        cmd.parameters.push(MssqlParameterFactory.create_input_parameter(
            "returnedid",
            RowValues::Int(1),
            DbType::Int64,
            true,
        ));
        assert!(matches!(
            MssqlIdentityRetriever.prepare_insert(&mut cmd, CommandKind::Text, &MssqlParameterFactory),
            Err(SqlProviderError::ParameterError(_))
        ));
    }

    #[test]
    fn provider_builds_closed_connections() {
        let cfg = ConnectionConfig::new(DatabaseType::Mssql, "server=tcp:localhost,1433");
        let conn = MssqlProvider.create_connection(&cfg).unwrap();
        assert!(!conn.is_open());
        assert!(MssqlProvider
            .create_connection(&ConnectionConfig::new(DatabaseType::MySql, "mysql://x"))
            .is_err());
    }
}
