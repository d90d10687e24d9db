//! Provider-agnostic SQL execution for MySQL and SQL Server.
//!
//! One API runs parameterized SQL, manages a connection and its transaction,
//! and maps result rows into typed records. The backend is picked at runtime from
//! [`DatabaseType`]; each backend is compiled in through its cargo feature
//! (`mysql`, `mssql`).
//!
//! ```rust,no_run
//! use sql_provider::prelude::*;
//!
//! #[derive(Debug, Default)]
//! struct Account {
//!     id: i32,
//!     owner: String,
//! }
//!
//! sql_provider::map_row!(Account { id => "Id", owner => "Owner" });
//!
//! # async fn demo() -> Result<(), SqlProviderError> {
//! let config = ConnectionConfig::from_env("BANK")?;
//! let mut service = SqlService::new(config)?;
//! let accounts: Vec<Account> = service
//!     .select("SELECT Id, Owner FROM accounts", Vec::new(), &CommandOptions::default())
//!     .await?;
//! # Ok(()) }
//! ```

pub mod blocking;
pub mod command;
pub mod config;
pub mod error;
mod guard;
pub mod manager;
pub mod mapping;
pub mod params;
pub mod prelude;
pub mod provider;
pub mod reader;
pub mod results;
pub mod service;
pub mod translation;
pub mod types;

#[cfg(feature = "mssql")]
pub mod mssql;
#[cfg(feature = "mysql")]
pub mod mysql;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use command::{Command, CommandOptions, DEFAULT_TIMEOUT_SECS, build_command};
pub use config::ConnectionConfig;
pub use error::SqlProviderError;
pub use manager::{ConnectionManager, ConnectionState, Transaction};
pub use mapping::{MapRow, MappingMode, RowSchema, SqlField, schema_of};
pub use params::{Parameter, ParameterFactory};
pub use provider::{Provider, command_for, parameter_for, provider_for};
pub use reader::DataReader;
pub use results::{CustomDbRow, ResultSet};
pub use service::{InsertResult, SqlService};
pub use types::{CommandKind, DatabaseType, DbType, ParameterDirection, RowValues};
