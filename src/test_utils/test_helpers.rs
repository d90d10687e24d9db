//! Helper utilities for testing and development.

use std::sync::Arc;

use super::mock::{MockConnection, MockHandle};
use crate::config::ConnectionConfig;
use crate::error::SqlProviderError;
use crate::results::CustomDbRow;
use crate::service::SqlService;
use crate::types::{DatabaseType, RowValues};

/// Create a test row with the given column names and values.
#[must_use]
pub fn create_test_row(column_names: Vec<String>, values: Vec<RowValues>) -> CustomDbRow {
    CustomDbRow::new(Arc::new(column_names), values)
}

/// An async service over a fresh [`MockConnection`], plus the handle that scripts it.
///
/// # Errors
/// Returns `UnsupportedBackend` when `database_type` was not compiled in.
pub fn mock_service(database_type: DatabaseType) -> Result<(SqlService, MockHandle), SqlProviderError> {
    let connection = MockConnection::new(database_type);
    let handle = connection.handle();
    let config = ConnectionConfig::new(database_type, "mock");
    let service = SqlService::from_connection(config, Box::new(connection))?;
    Ok((service, handle))
}
