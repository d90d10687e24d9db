//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::command::{Command, CommandOptions};
pub use crate::config::ConnectionConfig;
pub use crate::error::SqlProviderError;
pub use crate::manager::{ConnectionState, Transaction};
pub use crate::map_row;
pub use crate::mapping::{MapRow, MappingMode, RowSchema, SqlField, schema_of};
pub use crate::params::{Parameter, ParameterFactory};
pub use crate::reader::DataReader;
pub use crate::results::{CustomDbRow, ResultSet};
pub use crate::service::{InsertResult, SqlService};
pub use crate::translation::{PlaceholderStyle, bind_named_placeholders};
pub use crate::types::{CommandKind, DatabaseType, DbType, ParameterDirection, RowValues};
