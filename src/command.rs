use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::SqlProviderError;
use crate::guard::check_cancelled;
use crate::manager::Transaction;
use crate::params::Parameter;
use crate::provider::PhysicalConnection;
use crate::types::{CommandKind, DatabaseType, RowValues};

/// Default per-command timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u32 = 30;

/// Per-call options for command construction and execution.
///
/// # Examples
/// ```rust
/// use sql_provider::prelude::*;
///
/// let options = CommandOptions::default()
///     .with_kind(CommandKind::StoredProcedure)
///     .with_timeout(5);
/// # let _ = options;
/// ```
#[derive(Debug, Clone)]
pub struct CommandOptions {
    pub kind: CommandKind,
    pub prepare: bool,
    pub timeout_secs: u32,
    pub cancel: Option<CancellationToken>,
}

impl Default for CommandOptions {
    fn default() -> Self {
        Self {
            kind: CommandKind::Text,
            prepare: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            cancel: None,
        }
    }
}

impl CommandOptions {
    #[must_use]
    pub fn with_kind(mut self, kind: CommandKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn with_prepare(mut self, prepare: bool) -> Self {
        self.prepare = prepare;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout_secs: u32) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Backend handle produced by a prepare step.
#[derive(Debug, Clone)]
pub enum PreparedStatement {
    #[cfg(feature = "mysql")]
    MySql(mysql_async::Statement),
    /// Backends without a statement handle; execution re-sends the text and the
    /// server's plan cache does the rest.
    Marker,
}

/// An executable command: SQL text plus everything needed to run it once.
///
/// Commands are transient; build one per execution.
#[derive(Debug, Clone)]
pub struct Command {
    pub database_type: DatabaseType,
    pub sql: String,
    pub transaction: Option<Transaction>,
    pub parameters: Vec<Parameter>,
    pub kind: CommandKind,
    /// Seconds; `None` until the factory finalizes the command.
    pub timeout: Option<u32>,
    pub(crate) prepared: Option<PreparedStatement>,
    pub(crate) last_insert_id: Option<u64>,
    pub(crate) cancel: Option<CancellationToken>,
}

impl Command {
    #[must_use]
    pub fn new(database_type: DatabaseType, sql: impl Into<String>) -> Self {
        Self {
            database_type,
            sql: sql.into(),
            transaction: None,
            parameters: Vec::new(),
            kind: CommandKind::Text,
            timeout: None,
            prepared: None,
            last_insert_id: None,
            cancel: None,
        }
    }

    #[must_use]
    pub fn is_prepared(&self) -> bool {
        self.prepared.is_some()
    }

    /// Identity the driver reported for the last insert this command ran.
    #[must_use]
    pub fn last_insert_id(&self) -> Option<u64> {
        self.last_insert_id
    }

    /// Case-insensitive lookup by parameter name, with or without the `@`.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        let wanted = crate::params::bare_name(name);
        self.parameters
            .iter()
            .find(|p| p.bare_name().eq_ignore_ascii_case(wanted))
    }

    /// Value of an output parameter after execution.
    #[must_use]
    pub fn output_value(&self, name: &str) -> Option<&RowValues> {
        self.parameter(name)
            .filter(|p| p.is_output())
            .map(|p| &p.value)
    }

    pub(crate) fn cancel_token(&self) -> Option<&CancellationToken> {
        self.cancel.as_ref()
    }

    pub(crate) fn set_output(&mut self, name: &str, value: RowValues) {
        let wanted = crate::params::bare_name(name);
        if let Some(p) = self
            .parameters
            .iter_mut()
            .find(|p| p.is_output() && p.bare_name().eq_ignore_ascii_case(wanted))
        {
            p.value = value;
        }
    }
}

/// Build an executable command against `connection`.
///
/// The steps run in a fixed order: construct, attach parameters, attach the
/// transaction, prepare (when requested), then set kind and timeout. Cancellation
/// is honored up to the prepare step.
///
/// # Errors
/// Returns `ParameterError` for parameters built for another backend, `Cancelled`
/// when the token fires before prepare, or the backend's prepare error.
pub async fn build_command(
    connection: &mut dyn PhysicalConnection,
    sql: &str,
    transaction: Option<Transaction>,
    parameters: Vec<Parameter>,
    options: &CommandOptions,
) -> Result<Command, SqlProviderError> {
    build_command_with(connection, sql, transaction, parameters, options, |_| Ok(())).await
}

/// [`build_command`] with a hook that may rewrite the command after parameters
/// and transaction are attached and before it is prepared.
pub(crate) async fn build_command_with<F>(
    connection: &mut dyn PhysicalConnection,
    sql: &str,
    transaction: Option<Transaction>,
    parameters: Vec<Parameter>,
    options: &CommandOptions,
    adjust: F,
) -> Result<Command, SqlProviderError>
where
    F: FnOnce(&mut Command) -> Result<(), SqlProviderError>,
{
    let database_type = connection.database_type();
    let mut command = Command::new(database_type, sql);
    command.cancel.clone_from(&options.cancel);

    if let Some(foreign) = parameters
        .iter()
        .find(|p| p.database_type != database_type)
    {
        return Err(SqlProviderError::ParameterError(format!(
            "parameter `{}` was built for {} but the command targets {database_type}",
            foreign.name, foreign.database_type
        )));
    }
    command.parameters = parameters;

    if let Some(tx) = transaction {
        command.transaction = Some(tx);
    }

    adjust(&mut command)?;

    if options.prepare {
        check_cancelled(options.cancel.as_ref())?;
        connection.prepare(&mut command).await?;
    }

    command.kind = options.kind;
    command.timeout = Some(options.timeout_secs);

    debug!(
        backend = %database_type,
        kind = ?command.kind,
        params = command.parameters.len(),
        prepared = command.is_prepared(),
        "built command"
    );
    Ok(command)
}
