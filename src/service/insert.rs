use tracing::debug;

use super::SqlService;
use crate::command::CommandOptions;
use crate::error::SqlProviderError;
use crate::mapping::{MapRow, schema_of};
use crate::params::Parameter;
use crate::types::RowValues;

/// Outcome of an insert: rows affected and the generated identity, if the
/// backend produced one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InsertResult {
    pub rows_affected: i64,
    pub id: Option<RowValues>,
}

impl InsertResult {
    /// The identity as an integer, when it is integral and fits.
    #[must_use]
    pub fn id_as_i64(&self) -> Option<i64> {
        match self.id.as_ref()? {
            RowValues::Int(i) => Some(*i),
            RowValues::Decimal(d) => rust_decimal::prelude::ToPrimitive::to_i64(d),
            RowValues::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// `INSERT INTO table (a, b) VALUES (@a, @b);`
pub(crate) fn build_insert_statement<'a>(
    table_name: &str,
    columns: impl IntoIterator<Item = &'a str>,
) -> String {
    let columns: Vec<&str> = columns.into_iter().collect();
    let placeholders: Vec<String> = columns.iter().map(|c| format!("@{c}")).collect();
    format!(
        "INSERT INTO {table_name} ({}) VALUES ({});",
        columns.join(", "),
        placeholders.join(", ")
    )
}

impl SqlService {
    /// Run an insert and recover the generated identity the backend's way.
    ///
    /// # Errors
    /// Returns `ParameterError` when a parameter uses a name the identity protocol
    /// reserves, otherwise the driver's error, `Timeout` or `Cancelled`.
    pub async fn execute_insert(
        &mut self,
        sql: &str,
        parameters: Vec<Parameter>,
        options: &CommandOptions,
    ) -> Result<InsertResult, SqlProviderError> {
        let retriever = self.provider.identity_retriever();
        let factory = self.provider.parameter_factory();
        let kind = options.kind;

        let mut command = self
            .command_with(sql, parameters, options, |command| {
                retriever.prepare_insert(command, kind, factory)
            })
            .await?;
        let reported = self
            .run_non_query(&mut command, options.cancel.as_ref())
            .await?;

        let result = InsertResult {
            rows_affected: retriever.rows_affected(&command, reported),
            id: retriever.identity(&command),
        };
        debug!(rows = result.rows_affected, id = ?result.id, "insert finished");
        Ok(result)
    }

    /// Insert every registered field of `item` into the same-named column.
    ///
    /// # Errors
    /// As [`SqlService::execute_insert`].
    pub async fn execute_text_insert<T: MapRow>(
        &mut self,
        item: &T,
        table_name: &str,
        options: &CommandOptions,
    ) -> Result<InsertResult, SqlProviderError> {
        let schema = schema_of::<T>();
        let factory = self.parameter_factory();
        let parameters: Vec<Parameter> = schema
            .fields()
            .iter()
            .map(|field| {
                factory.create_input_parameter(
                    &format!("@{}", field.name()),
                    field.value(item),
                    field.db_type(),
                    true,
                )
            })
            .collect();
        let sql = build_insert_statement(table_name, schema.fields().iter().map(|f| f.name()));
        self.execute_insert(&sql, parameters, options).await
    }

    /// Insert the caller's parameters into the same-named columns.
    ///
    /// # Errors
    /// Returns `ParameterError` for an empty list, otherwise as
    /// [`SqlService::execute_insert`].
    pub async fn execute_text_insert_params(
        &mut self,
        table_name: &str,
        parameters: Vec<Parameter>,
        options: &CommandOptions,
    ) -> Result<InsertResult, SqlProviderError> {
        if parameters.is_empty() {
            return Err(SqlProviderError::ParameterError(format!(
                "no columns to insert into {table_name}"
            )));
        }
        let sql = build_insert_statement(table_name, parameters.iter().map(Parameter::bare_name));
        self.execute_insert(&sql, parameters, options).await
    }
}
