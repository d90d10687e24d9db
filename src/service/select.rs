use super::SqlService;
use crate::command::CommandOptions;
use crate::error::SqlProviderError;
use crate::mapping::MapRow;
use crate::params::Parameter;

fn no_rows<T>(sql: &str) -> SqlProviderError {
    SqlProviderError::NoRows {
        sql: sql.to_string(),
        target: std::any::type_name::<T>(),
    }
}

impl SqlService {
    /// Map every row of the query into `T`. No rows yields an empty vector; the
    /// blocking facade's `select` fails instead.
    ///
    /// # Errors
    /// Returns the driver's error, `Timeout`, `Cancelled`, or a strict-mode
    /// `Mapping` error.
    pub async fn select<T: MapRow>(
        &mut self,
        sql: &str,
        parameters: Vec<Parameter>,
        options: &CommandOptions,
    ) -> Result<Vec<T>, SqlProviderError> {
        let mut reader = self.execute_reader(sql, parameters, options).await?;
        let mapped = match reader.has_rows().await {
            Ok(true) => reader.map_all::<T>().await,
            Ok(false) => Ok(Vec::new()),
            Err(e) => Err(e),
        };
        let closed = reader.close().await;
        let records = mapped?;
        closed?;
        Ok(records)
    }

    /// Map the first row into `T`.
    ///
    /// # Errors
    /// Returns `NoRows` when the query returns nothing, otherwise as
    /// [`SqlService::select`].
    pub async fn select_first<T: MapRow>(
        &mut self,
        sql: &str,
        parameters: Vec<Parameter>,
        options: &CommandOptions,
    ) -> Result<T, SqlProviderError> {
        self.select_first_inner::<T>(sql, parameters, options)
            .await?
            .ok_or_else(|| no_rows::<T>(sql))
    }

    /// Map the first row into `T`, or return `T::default()` when there are none.
    ///
    /// # Errors
    /// As [`SqlService::select`]; never fails for the no-rows case.
    pub async fn select_first_or_default<T: MapRow>(
        &mut self,
        sql: &str,
        parameters: Vec<Parameter>,
        options: &CommandOptions,
    ) -> Result<T, SqlProviderError> {
        Ok(self
            .select_first_inner::<T>(sql, parameters, options)
            .await?
            .unwrap_or_default())
    }

    async fn select_first_inner<T: MapRow>(
        &mut self,
        sql: &str,
        parameters: Vec<Parameter>,
        options: &CommandOptions,
    ) -> Result<Option<T>, SqlProviderError> {
        let mut reader = self.execute_reader(sql, parameters, options).await?;
        let mapped = match reader.has_rows().await {
            Ok(true) => reader.map_first::<T>().await,
            Ok(false) => Ok(None),
            Err(e) => Err(e),
        };
        let closed = reader.close().await;
        let record = mapped?;
        closed?;
        Ok(record)
    }

    /// Like [`SqlService::select`] but fails with `NoRows` on an empty result.
    pub(crate) async fn select_strict<T: MapRow>(
        &mut self,
        sql: &str,
        parameters: Vec<Parameter>,
        options: &CommandOptions,
    ) -> Result<Vec<T>, SqlProviderError> {
        let records = self.select::<T>(sql, parameters, options).await?;
        if records.is_empty() {
            return Err(no_rows::<T>(sql));
        }
        Ok(records)
    }
}
