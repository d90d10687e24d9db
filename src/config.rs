use serde::{Deserialize, Serialize};

use crate::error::SqlProviderError;
use crate::types::DatabaseType;

/// Connection configuration consumed once at construction.
///
/// The connection string is driver-native and opaque to this layer: a
/// `mysql://` URL for MySQL, an ADO.NET-style string for SQL Server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub database_type: DatabaseType,
    pub connection_string: String,
    #[serde(default)]
    pub name: String,
}

impl ConnectionConfig {
    #[must_use]
    pub fn new(database_type: DatabaseType, connection_string: impl Into<String>) -> Self {
        Self {
            database_type,
            connection_string: connection_string.into(),
            name: String::new(),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Read `<PREFIX>_PROVIDER`, `<PREFIX>_CONNECTION_STRING` and optionally `<PREFIX>_NAME`.
    ///
    /// # Errors
    /// Returns `ConfigError` when a required variable is missing and
    /// `UnsupportedBackend` when the provider value is not recognised.
    pub fn from_env(prefix: &str) -> Result<Self, SqlProviderError> {
        let provider = read_var(prefix, "PROVIDER")?;
        let connection_string = read_var(prefix, "CONNECTION_STRING")?;
        let name = std::env::var(format!("{prefix}_NAME")).unwrap_or_default();

        Ok(Self {
            database_type: provider.parse()?,
            connection_string,
            name,
        })
    }
}

fn read_var(prefix: &str, key: &str) -> Result<String, SqlProviderError> {
    let var = format!("{prefix}_{key}");
    std::env::var(&var)
        .map_err(|e| SqlProviderError::ConfigError(format!("{var}: {e}")))
}
