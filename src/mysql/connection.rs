use std::sync::Arc;

use async_trait::async_trait;
use mysql_async::prelude::{Protocol, Queryable};
use mysql_async::{Conn, Opts, QueryResult, Row};
use tracing::debug;

use super::query::{ColumnKind, ExecutionPlan, column_names, plan, row_values};
use crate::command::{Command, PreparedStatement};
use crate::error::SqlProviderError;
use crate::provider::{PhysicalConnection, RowCursor};
use crate::types::{CommandKind, DatabaseType, RowValues};

/// A single `mysql_async` session opened from a `mysql://` URL.
pub struct MySqlConnection {
    url: String,
    conn: Option<Conn>,
}

impl MySqlConnection {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            conn: None,
        }
    }

    fn conn(&mut self) -> Result<&mut Conn, SqlProviderError> {
        self.conn
            .as_mut()
            .ok_or_else(|| SqlProviderError::ConnectionError("MySQL connection is not open".into()))
    }

    /// Server statement to run: the prepared handle while the command is still
    /// plain text, otherwise the rendered SQL.
    fn prepared_for(command: &Command) -> Option<mysql_async::Statement> {
        match (&command.prepared, command.kind) {
            (Some(PreparedStatement::MySql(stmt)), CommandKind::Text) => Some(stmt.clone()),
            _ => None,
        }
    }

    async fn run_setup(&mut self, plan: &ExecutionPlan) -> Result<(), SqlProviderError> {
        let conn = self.conn()?;
        for (sql, value) in &plan.setup {
            conn.exec_drop(sql.as_str(), vec![value.clone()]).await?;
        }
        Ok(())
    }

    async fn read_outputs(
        &mut self,
        plan: &ExecutionPlan,
        command: &mut Command,
    ) -> Result<(), SqlProviderError> {
        let Some(query) = plan.output_query() else {
            return Ok(());
        };
        let row: Option<Row> = self.conn()?.query_first(query).await?;
        if let Some(row) = row {
            let kinds: Vec<ColumnKind> = row.columns_ref().iter().map(ColumnKind::of).collect();
            for (name, value) in plan.outputs.iter().zip(row_values(row, &kinds)) {
                command.set_output(name, value);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PhysicalConnection for MySqlConnection {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::MySql
    }

    fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    async fn open(&mut self) -> Result<(), SqlProviderError> {
        if self.conn.is_some() {
            return Ok(());
        }
        let opts = Opts::from_url(&self.url)?;
        self.conn = Some(Conn::new(opts).await?);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SqlProviderError> {
        if let Some(conn) = self.conn.take() {
            conn.disconnect().await?;
        }
        Ok(())
    }

    async fn begin(&mut self) -> Result<(), SqlProviderError> {
        self.conn()?.query_drop("START TRANSACTION").await?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), SqlProviderError> {
        self.conn()?.query_drop("COMMIT").await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), SqlProviderError> {
        self.conn()?.query_drop("ROLLBACK").await?;
        Ok(())
    }

    async fn prepare(&mut self, command: &mut Command) -> Result<(), SqlProviderError> {
        let plan = plan(command)?;
        let stmt = self.conn()?.prep(plan.sql).await?;
        command.prepared = Some(PreparedStatement::MySql(stmt));
        Ok(())
    }

    async fn execute_non_query(&mut self, command: &mut Command) -> Result<i64, SqlProviderError> {
        let plan = plan(command)?;
        self.run_setup(&plan).await?;

        let prepared = Self::prepared_for(command);
        let conn = self.conn()?;
        match prepared {
            Some(stmt) => conn.exec_drop(stmt, plan.params()).await?,
            None if plan.values.is_empty() => conn.query_drop(plan.sql.as_str()).await?,
            None => conn.exec_drop(plan.sql.as_str(), plan.params()).await?,
        }
        let affected = i64::try_from(conn.affected_rows()).unwrap_or(i64::MAX);
        command.last_insert_id = conn.last_insert_id().filter(|id| *id != 0);
        debug!(affected, last_insert_id = ?command.last_insert_id, "mysql non-query");

        self.read_outputs(&plan, command).await?;
        Ok(affected)
    }

    async fn execute_scalar(
        &mut self,
        command: &mut Command,
    ) -> Result<Option<RowValues>, SqlProviderError> {
        let plan = plan(command)?;
        self.run_setup(&plan).await?;

        let prepared = Self::prepared_for(command);
        let conn = self.conn()?;
        let row: Option<Row> = match prepared {
            Some(stmt) => conn.exec_first(stmt, plan.params()).await?,
            None if plan.values.is_empty() => conn.query_first(plan.sql.as_str()).await?,
            None => conn.exec_first(plan.sql.as_str(), plan.params()).await?,
        };
        let value = row.and_then(|row| {
            let kinds: Vec<ColumnKind> = row.columns_ref().iter().map(ColumnKind::of).collect();
            row_values(row, &kinds).into_iter().next()
        });

        self.read_outputs(&plan, command).await?;
        Ok(value)
    }

    async fn execute_reader<'c>(
        &'c mut self,
        command: &mut Command,
    ) -> Result<Box<dyn RowCursor + 'c>, SqlProviderError> {
        let plan = plan(command)?;
        self.run_setup(&plan).await?;

        let prepared = Self::prepared_for(command);
        let conn = self.conn()?;
        let cursor: Box<dyn RowCursor + 'c> = match prepared {
            Some(stmt) => Box::new(MySqlCursor::new(conn.exec_iter(stmt, plan.params()).await?)),
            None if plan.values.is_empty() => {
                Box::new(MySqlCursor::new(conn.query_iter(plan.sql).await?))
            }
            None => Box::new(MySqlCursor::new(
                conn.exec_iter(plan.sql.as_str(), plan.params()).await?,
            )),
        };
        Ok(cursor)
    }

    async fn execute_batch(&mut self, sql: &str) -> Result<(), SqlProviderError> {
        self.conn()?.query_drop(sql).await?;
        Ok(())
    }
}

/// Cursor over the first result set of a `mysql_async` query.
struct MySqlCursor<'c, P: Protocol> {
    result: Option<QueryResult<'c, 'static, P>>,
    columns: Arc<Vec<String>>,
    kinds: Vec<ColumnKind>,
    buffered: Option<Vec<RowValues>>,
}

impl<'c, P: Protocol> MySqlCursor<'c, P> {
    fn new(result: QueryResult<'c, 'static, P>) -> Self {
        let columns = result.columns_ref();
        let names = column_names(columns);
        let kinds = columns.iter().map(ColumnKind::of).collect();
        Self {
            result: Some(result),
            columns: Arc::new(names),
            kinds,
            buffered: None,
        }
    }

    async fn fetch(&mut self) -> Result<Option<Vec<RowValues>>, SqlProviderError> {
        let Some(result) = self.result.as_mut() else {
            return Ok(None);
        };
        match result.next().await? {
            Some(row) => Ok(Some(row_values(row, &self.kinds))),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl<P: Protocol> RowCursor for MySqlCursor<'_, P> {
    fn column_names(&self) -> Arc<Vec<String>> {
        Arc::clone(&self.columns)
    }

    async fn has_rows(&mut self) -> Result<bool, SqlProviderError> {
        if self.buffered.is_none() {
            self.buffered = self.fetch().await?;
        }
        Ok(self.buffered.is_some())
    }

    async fn next_row(&mut self) -> Result<Option<Vec<RowValues>>, SqlProviderError> {
        if let Some(row) = self.buffered.take() {
            return Ok(Some(row));
        }
        self.fetch().await
    }

    async fn close(&mut self) -> Result<(), SqlProviderError> {
        self.buffered = None;
        if let Some(result) = self.result.take() {
            result.drop_result().await?;
        }
        Ok(())
    }
}
