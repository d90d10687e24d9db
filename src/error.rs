use thiserror::Error;

/// Errors surfaced by the provider layer.
///
/// Driver errors are carried through unchanged (`transparent`); the remaining
/// variants are the layer's own configuration, state and mapping failures.
#[derive(Debug, Error)]
pub enum SqlProviderError {
    #[cfg(feature = "mysql")]
    #[error(transparent)]
    MySqlError(#[from] mysql_async::Error),

    #[cfg(feature = "mysql")]
    #[error(transparent)]
    MySqlUrlError(#[from] mysql_async::UrlError),

    #[cfg(feature = "mssql")]
    #[error(transparent)]
    MssqlError(#[from] tiberius::error::Error),

    #[error("Unsupported backend: {0}")]
    UnsupportedBackend(String),

    #[error("A transaction has not been initialized.")]
    NoActiveTransaction,

    #[error("Executing {sql} returned no records to cast to type {target}.")]
    NoRows { sql: String, target: &'static str },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Mapping error on field `{field}`: {reason}")]
    Mapping { field: String, reason: String },

    #[error("Command timed out after {0} seconds")]
    Timeout(u32),

    #[error("Operation was cancelled")]
    Cancelled,
}

impl SqlProviderError {
    /// True for the layer's fatal configuration/state errors (never retried).
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedBackend(_) | Self::NoActiveTransaction | Self::ConfigError(_)
        )
    }
}
