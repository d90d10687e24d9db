use chrono::{Datelike, Timelike};
use mysql_async::Value;

use crate::params::ParameterFactory;
use crate::types::{DatabaseType, DbType, RowValues};

/// Parameter factory for MySQL / MariaDB.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlParameterFactory;

impl ParameterFactory for MySqlParameterFactory {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::MySql
    }

    fn native_type_name(&self, db_type: DbType) -> &'static str {
        match db_type {
            DbType::AnsiString | DbType::String => "VARCHAR",
            DbType::AnsiStringFixedLength | DbType::StringFixedLength => "CHAR",
            DbType::Binary | DbType::Object => "BLOB",
            DbType::Boolean => "TINYINT(1)",
            DbType::Byte => "TINYINT UNSIGNED",
            DbType::Date => "DATE",
            DbType::DateTime => "DATETIME",
            DbType::Decimal => "DECIMAL",
            DbType::Double => "DOUBLE",
            DbType::Guid => "CHAR(36)",
            DbType::Int16 => "SMALLINT",
            DbType::Int32 => "INT",
            DbType::Int64 => "BIGINT",
            DbType::Json => "JSON",
            DbType::Single => "FLOAT",
            DbType::Time => "TIME",
        }
    }
}

/// Convert a parameter value to the driver's wire value.
pub(crate) fn to_mysql_value(value: &RowValues) -> Value {
    match value {
        RowValues::Int(i) => Value::Int(*i),
        RowValues::Float(f) => Value::Double(*f),
        RowValues::Decimal(d) => Value::Bytes(d.to_string().into_bytes()),
        RowValues::Text(s) | RowValues::InvalidTimestamp(s) => Value::Bytes(s.clone().into_bytes()),
        RowValues::Bool(b) => Value::Int(i64::from(*b)),
        RowValues::Timestamp(dt) => Value::Date(
            u16::try_from(dt.year()).unwrap_or(0),
            u8::try_from(dt.month()).unwrap_or(0),
            u8::try_from(dt.day()).unwrap_or(0),
            u8::try_from(dt.hour()).unwrap_or(0),
            u8::try_from(dt.minute()).unwrap_or(0),
            u8::try_from(dt.second()).unwrap_or(0),
            (dt.nanosecond() / 1_000).min(999_999),
        ),
        RowValues::Uuid(u) => Value::Bytes(u.hyphenated().to_string().into_bytes()),
        RowValues::Null => Value::NULL,
        RowValues::JSON(json) => Value::Bytes(json.to_string().into_bytes()),
        RowValues::Blob(bytes) => Value::Bytes(bytes.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParameterDirection;
    use chrono::NaiveDate;

    #[test]
    fn factory_preserves_requested_shape() {
        let f = MySqlParameterFactory;
        let p = f.create_parameter(
            "@id",
            RowValues::Int(4),
            DbType::Int32,
            ParameterDirection::InputOutput,
            false,
        );
        assert_eq!(p.name, "@id");
        assert_eq!(p.db_type, DbType::Int32);
        assert_eq!(p.direction, ParameterDirection::InputOutput);
        assert!(!p.nullable);
        assert_eq!(p.native_type, "INT");
        assert_eq!(p.database_type, DatabaseType::MySql);
    }

    #[test]
    fn timestamps_become_date_values() {
        let dt = NaiveDate::from_ymd_opt(2024, 2, 29)
            .and_then(|d| d.and_hms_micro_opt(13, 4, 5, 250))
            .unwrap();
        assert_eq!(
            to_mysql_value(&RowValues::Timestamp(dt)),
            Value::Date(2024, 2, 29, 13, 4, 5, 250)
        );
        assert_eq!(to_mysql_value(&RowValues::Bool(true)), Value::Int(1));
        assert_eq!(to_mysql_value(&RowValues::Null), Value::NULL);
    }

    #[test]
    fn leap_second_microseconds_stay_in_range() {
        let dt = NaiveDate::from_ymd_opt(2016, 12, 31)
            .and_then(|d| d.and_hms_micro_opt(23, 59, 59, 1_500_000))
            .unwrap();
        assert_eq!(
            to_mysql_value(&RowValues::Timestamp(dt)),
            Value::Date(2016, 12, 31, 23, 59, 59, 999_999)
        );
    }
}
