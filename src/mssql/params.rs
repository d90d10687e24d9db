use crate::params::ParameterFactory;
use crate::types::{DatabaseType, DbType};

/// Parameter factory for SQL Server.
///
/// Native type names double as the declared type of output variables in the
/// rendered batch, so they are complete T-SQL type expressions.
#[derive(Debug, Clone, Copy, Default)]
pub struct MssqlParameterFactory;

impl ParameterFactory for MssqlParameterFactory {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Mssql
    }

    fn native_type_name(&self, db_type: DbType) -> &'static str {
        match db_type {
            DbType::String | DbType::Json => "NVARCHAR(MAX)",
            DbType::AnsiString => "VARCHAR(MAX)",
            DbType::StringFixedLength => "NVARCHAR(4000)",
            DbType::AnsiStringFixedLength => "VARCHAR(8000)",
            DbType::Int64 => "BIGINT",
            DbType::Int32 => "INT",
            DbType::Int16 => "SMALLINT",
            DbType::Byte => "TINYINT",
            DbType::Boolean => "BIT",
            DbType::Decimal => "DECIMAL(38,10)",
            DbType::Double => "FLOAT",
            DbType::Single => "REAL",
            DbType::DateTime => "DATETIME2",
            DbType::Date => "DATE",
            DbType::Time => "TIME",
            DbType::Guid => "UNIQUEIDENTIFIER",
            DbType::Binary => "VARBINARY(MAX)",
            DbType::Object => "SQL_VARIANT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ParameterDirection, RowValues};

    #[test]
    fn factory_preserves_requested_shape() {
        let f = MssqlParameterFactory;
        for (direction, nullable) in [
            (ParameterDirection::Input, true),
            (ParameterDirection::Output, false),
            (ParameterDirection::InputOutput, true),
            (ParameterDirection::ReturnValue, false),
        ] {
            let p = f.create_parameter("@n", RowValues::Int(1), DbType::Int64, direction, nullable);
            assert_eq!(p.direction, direction);
            assert_eq!(p.nullable, nullable);
            assert_eq!(p.name, "@n");
            assert_eq!(p.db_type, DbType::Int64);
            assert_eq!(p.native_type, "BIGINT");
        }
    }
}
