use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use mysql_async::consts::{ColumnFlags, ColumnType};
use mysql_async::{Column, Params, Row, Value};
use rust_decimal::Decimal;

use super::params::to_mysql_value;
use crate::command::Command;
use crate::error::SqlProviderError;
use crate::translation::{PlaceholderStyle, bind_named_placeholders};
use crate::types::{CommandKind, ParameterDirection, RowValues};

/// SQL and values ready for the wire.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ExecutionPlan {
    /// `SET @name = ?` statements run before the main statement: in/out parameters
    /// get their value, pure outputs are reset to `NULL`.
    pub setup: Vec<(String, Value)>,
    pub sql: String,
    pub values: Vec<Value>,
    /// Session variables read back after execution.
    pub outputs: Vec<String>,
}

impl ExecutionPlan {
    pub(crate) fn params(&self) -> Params {
        if self.values.is_empty() {
            Params::Empty
        } else {
            Params::Positional(self.values.clone())
        }
    }

    /// `SELECT @a, @b` for the output variables, if any.
    pub(crate) fn output_query(&self) -> Option<String> {
        if self.outputs.is_empty() {
            return None;
        }
        let vars: Vec<String> = self.outputs.iter().map(|n| format!("@{n}")).collect();
        Some(format!("SELECT {}", vars.join(", ")))
    }
}

/// Render a command for MySQL.
///
/// Output and in/out parameters travel through session variables named after the
/// parameter; `ReturnValue` has no MySQL equivalent.
pub(crate) fn plan(command: &Command) -> Result<ExecutionPlan, SqlProviderError> {
    let mut setup = Vec::new();
    let mut outputs = Vec::new();

    for p in &command.parameters {
        match p.direction {
            ParameterDirection::Input => {}
            ParameterDirection::Output => {
                // session variables outlive the statement
                setup.push((format!("SET @{} = ?", p.bare_name()), Value::NULL));
                outputs.push(p.bare_name().to_string());
            }
            ParameterDirection::InputOutput => {
                setup.push((format!("SET @{} = ?", p.bare_name()), to_mysql_value(&p.value)));
                outputs.push(p.bare_name().to_string());
            }
            ParameterDirection::ReturnValue => {
                return Err(SqlProviderError::ParameterError(format!(
                    "MySQL has no return-value parameters (`{}`)",
                    p.name
                )));
            }
        }
    }

    let (sql, values) = match command.kind {
        CommandKind::Text => {
            let names: Vec<&str> = command
                .parameters
                .iter()
                .map(|p| {
                    if p.direction == ParameterDirection::Input {
                        p.bare_name()
                    } else {
                        ""
                    }
                })
                .collect();
            let bound = bind_named_placeholders(&command.sql, &names, PlaceholderStyle::Positional);
            let values = if bound.matched() {
                bound
                    .order
                    .iter()
                    .map(|&i| to_mysql_value(&command.parameters[i].value))
                    .collect()
            } else {
                command
                    .parameters
                    .iter()
                    .filter(|p| p.direction == ParameterDirection::Input)
                    .map(|p| to_mysql_value(&p.value))
                    .collect()
            };
            (bound.sql.into_owned(), values)
        }
        CommandKind::StoredProcedure => {
            let mut args = Vec::with_capacity(command.parameters.len());
            let mut values = Vec::new();
            for p in &command.parameters {
                if p.direction == ParameterDirection::Input {
                    args.push("?".to_string());
                    values.push(to_mysql_value(&p.value));
                } else {
                    args.push(format!("@{}", p.bare_name()));
                }
            }
            (
                format!("CALL {}({})", command.sql.trim(), args.join(", ")),
                values,
            )
        }
    };

    Ok(ExecutionPlan {
        setup,
        sql,
        values,
        outputs,
    })
}

/// What the converter needs to know about a result column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ColumnKind {
    pub column_type: ColumnType,
    pub binary: bool,
    pub unsigned: bool,
    pub length: u32,
}

impl ColumnKind {
    pub(crate) fn of(column: &Column) -> Self {
        let flags = column.flags();
        Self {
            column_type: column.column_type(),
            // charset 63 is `binary`
            binary: column.character_set() == 63,
            unsigned: flags.contains(ColumnFlags::UNSIGNED_FLAG),
            length: column.column_length(),
        }
    }
}

pub(crate) fn column_names(columns: &[Column]) -> Vec<String> {
    columns.iter().map(|c| c.name_str().into_owned()).collect()
}

pub(crate) fn row_values(row: Row, kinds: &[ColumnKind]) -> Vec<RowValues> {
    row.unwrap_raw()
        .into_iter()
        .enumerate()
        .map(|(i, value)| match (value, kinds.get(i)) {
            (Some(value), Some(kind)) => convert_value(value, *kind),
            (Some(value), None) => convert_untyped(value),
            (None, _) => RowValues::Null,
        })
        .collect()
}

/// Convert one wire value using its column metadata.
///
/// The binary protocol delivers typed values; the text protocol delivers bytes
/// for everything, so bytes are re-parsed according to the column type.
pub(crate) fn convert_value(value: Value, kind: ColumnKind) -> RowValues {
    let bytes = match value {
        Value::Bytes(bytes) => bytes,
        other => return convert_untyped(other),
    };

    match kind.column_type {
        ColumnType::MYSQL_TYPE_TINY
        | ColumnType::MYSQL_TYPE_SHORT
        | ColumnType::MYSQL_TYPE_LONG
        | ColumnType::MYSQL_TYPE_INT24
        | ColumnType::MYSQL_TYPE_LONGLONG
        | ColumnType::MYSQL_TYPE_YEAR => parse_integer(&bytes, kind.unsigned),
        ColumnType::MYSQL_TYPE_FLOAT | ColumnType::MYSQL_TYPE_DOUBLE => text_of(&bytes)
            .and_then(|s| s.parse::<f64>().ok())
            .map_or_else(|| fallback(bytes), RowValues::Float),
        ColumnType::MYSQL_TYPE_DECIMAL | ColumnType::MYSQL_TYPE_NEWDECIMAL => text_of(&bytes)
            .and_then(|s| Decimal::from_str(s).ok())
            .map_or_else(|| fallback(bytes), RowValues::Decimal),
        ColumnType::MYSQL_TYPE_DATE
        | ColumnType::MYSQL_TYPE_NEWDATE
        | ColumnType::MYSQL_TYPE_DATETIME
        | ColumnType::MYSQL_TYPE_DATETIME2
        | ColumnType::MYSQL_TYPE_TIMESTAMP
        | ColumnType::MYSQL_TYPE_TIMESTAMP2 => parse_datetime(bytes),
        ColumnType::MYSQL_TYPE_BIT if kind.length == 1 => {
            RowValues::Bool(bytes.iter().any(|b| *b != 0))
        }
        ColumnType::MYSQL_TYPE_BIT | ColumnType::MYSQL_TYPE_GEOMETRY => RowValues::Blob(bytes),
        ColumnType::MYSQL_TYPE_JSON => match serde_json::from_slice(&bytes) {
            Ok(json) => RowValues::JSON(json),
            Err(_) => fallback(bytes),
        },
        _ if kind.binary => RowValues::Blob(bytes),
        _ => fallback(bytes),
    }
}

fn convert_untyped(value: Value) -> RowValues {
    match value {
        Value::NULL => RowValues::Null,
        Value::Int(i) => RowValues::Int(i),
        Value::UInt(u) => i64::try_from(u)
            .map(RowValues::Int)
            .unwrap_or_else(|_| RowValues::Decimal(Decimal::from(u))),
        Value::Float(f) => RowValues::Float(f64::from(f)),
        Value::Double(f) => RowValues::Float(f),
        Value::Date(year, month, day, hour, minute, second, micros) => {
            let raw = format!(
                "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
            );
            NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))
                .and_then(|d| {
                    d.and_hms_micro_opt(u32::from(hour), u32::from(minute), u32::from(second), micros)
                })
                .map_or(RowValues::InvalidTimestamp(raw), RowValues::Timestamp)
        }
        Value::Time(negative, days, hours, minutes, seconds, micros) => {
            let total_hours = days * 24 + u32::from(hours);
            let sign = if negative { "-" } else { "" };
            let mut text = format!("{sign}{total_hours:02}:{minutes:02}:{seconds:02}");
            if micros > 0 {
                text.push_str(&format!(".{micros:06}"));
            }
            RowValues::Text(text)
        }
        Value::Bytes(bytes) => fallback(bytes),
    }
}

fn text_of(bytes: &[u8]) -> Option<&str> {
    std::str::from_utf8(bytes).ok()
}

fn fallback(bytes: Vec<u8>) -> RowValues {
    match String::from_utf8(bytes) {
        Ok(text) => RowValues::Text(text),
        Err(e) => RowValues::Blob(e.into_bytes()),
    }
}

fn parse_integer(bytes: &[u8], unsigned: bool) -> RowValues {
    let Some(text) = text_of(bytes) else {
        return RowValues::Blob(bytes.to_vec());
    };
    if let Ok(i) = text.parse::<i64>() {
        return RowValues::Int(i);
    }
    if unsigned && let Ok(u) = text.parse::<u64>() {
        return RowValues::Decimal(Decimal::from(u));
    }
    RowValues::Text(text.to_string())
}

fn parse_datetime(bytes: Vec<u8>) -> RowValues {
    let Some(text) = text_of(&bytes) else {
        return RowValues::Blob(bytes);
    };
    if text.starts_with("0000-00-00") || text.contains("-00") {
        return RowValues::InvalidTimestamp(text.to_string());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f") {
        return RowValues::Timestamp(dt);
    }
    if let Some(dt) = NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return RowValues::Timestamp(dt);
    }
    RowValues::InvalidTimestamp(text.to_string())
}
