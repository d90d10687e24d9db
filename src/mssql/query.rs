use std::borrow::Cow;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use tiberius::numeric::Numeric;
use tiberius::{ColumnData, FromSql, Query, Row};

use crate::params::Parameter;
use crate::types::{DbType, RowValues};

/// Bind the rendered batch's inputs onto a tiberius query, in `@Pn` order.
pub(crate) fn bind_query_params<'a>(
    sql: impl Into<Cow<'a, str>>,
    parameters: &[Parameter],
    inputs: &[usize],
) -> Query<'a> {
    let mut query = Query::new(sql);
    for &i in inputs {
        if let Some(p) = parameters.get(i) {
            bind_value(&mut query, &p.value, p.db_type);
        }
    }
    query
}

/// Bind one value. Nulls are typed from the parameter's type tag.
pub(crate) fn bind_value(query: &mut Query<'_>, value: &RowValues, db_type: DbType) {
    match value {
        RowValues::Int(i) => match db_type {
            DbType::Int32 if i32::try_from(*i).is_ok() => query.bind(*i as i32),
            DbType::Int16 if i16::try_from(*i).is_ok() => query.bind(*i as i16),
            DbType::Byte if u8::try_from(*i).is_ok() => query.bind(*i as u8),
            DbType::Boolean => query.bind(*i != 0),
            _ => query.bind(*i),
        },
        RowValues::Float(f) => match db_type {
            #[allow(clippy::cast_possible_truncation)]
            DbType::Single => query.bind(*f as f32),
            _ => query.bind(*f),
        },
        RowValues::Decimal(d) => query.bind(to_numeric(*d)),
        RowValues::Text(s) | RowValues::InvalidTimestamp(s) => query.bind(s.clone()),
        RowValues::Bool(b) => query.bind(*b),
        RowValues::Timestamp(dt) => match db_type {
            DbType::Date => query.bind(dt.date()),
            DbType::Time => query.bind(dt.time()),
            _ => query.bind(*dt),
        },
        RowValues::Uuid(u) => query.bind(u.hyphenated().to_string()),
        RowValues::JSON(json) => query.bind(json.to_string()),
        RowValues::Blob(bytes) => query.bind(bytes.clone()),
        RowValues::Null => bind_null(query, db_type),
    }
}

fn bind_null(query: &mut Query<'_>, db_type: DbType) {
    match db_type {
        DbType::Int64 => query.bind(Option::<i64>::None),
        DbType::Int32 => query.bind(Option::<i32>::None),
        DbType::Int16 => query.bind(Option::<i16>::None),
        DbType::Byte => query.bind(Option::<u8>::None),
        DbType::Boolean => query.bind(Option::<bool>::None),
        DbType::Double => query.bind(Option::<f64>::None),
        DbType::Single => query.bind(Option::<f32>::None),
        DbType::Decimal => query.bind(Option::<Numeric>::None),
        DbType::DateTime => query.bind(Option::<NaiveDateTime>::None),
        DbType::Date => query.bind(Option::<NaiveDate>::None),
        DbType::Time => query.bind(Option::<NaiveTime>::None),
        DbType::Binary => query.bind(Option::<Vec<u8>>::None),
        DbType::AnsiString
        | DbType::AnsiStringFixedLength
        | DbType::String
        | DbType::StringFixedLength
        | DbType::Guid
        | DbType::Json
        | DbType::Object => query.bind(Option::<String>::None),
    }
}

fn to_numeric(d: Decimal) -> Numeric {
    Numeric::new_with_scale(d.mantissa(), u8::try_from(d.scale()).unwrap_or(28))
}

/// Convert one column of a tiberius row.
pub(crate) fn column_value(data: ColumnData<'static>) -> RowValues {
    match data {
        ColumnData::U8(v) => v.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))),
        ColumnData::I16(v) => v.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))),
        ColumnData::I32(v) => v.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))),
        ColumnData::I64(v) => v.map_or(RowValues::Null, RowValues::Int),
        ColumnData::F32(v) => v.map_or(RowValues::Null, |v| RowValues::Float(f64::from(v))),
        ColumnData::F64(v) => v.map_or(RowValues::Null, RowValues::Float),
        ColumnData::Bit(v) => v.map_or(RowValues::Null, RowValues::Bool),
        ColumnData::String(v) => v.map_or(RowValues::Null, |s| RowValues::Text(s.into_owned())),
        ColumnData::Binary(v) => v.map_or(RowValues::Null, |b| RowValues::Blob(b.into_owned())),
        ColumnData::Guid(v) => v.map_or(RowValues::Null, |g| {
            RowValues::Uuid(uuid::Uuid::from_bytes(*g.as_bytes()))
        }),
        ColumnData::Numeric(v) => v.map_or(RowValues::Null, |n| {
            Decimal::try_from_i128_with_scale(n.value(), u32::from(n.scale()))
                .map_or_else(|_| RowValues::Text(n.to_string()), RowValues::Decimal)
        }),
        other => temporal_or_text(&other),
    }
}

fn temporal_or_text(data: &ColumnData<'static>) -> RowValues {
    if let Ok(Some(dt)) = NaiveDateTime::from_sql(data) {
        return RowValues::Timestamp(dt);
    }
    if let Ok(Some(d)) = NaiveDate::from_sql(data)
        && let Some(dt) = d.and_hms_opt(0, 0, 0)
    {
        return RowValues::Timestamp(dt);
    }
    if let Ok(Some(t)) = NaiveTime::from_sql(data) {
        return RowValues::Text(t.to_string());
    }
    if let Ok(Some(dto)) = DateTime::<FixedOffset>::from_sql(data) {
        return RowValues::Timestamp(dto.naive_utc());
    }
    match <&str>::from_sql(data) {
        Ok(Some(s)) => RowValues::Text(s.to_string()),
        _ => RowValues::Null,
    }
}

pub(crate) fn row_values(row: Row) -> Vec<RowValues> {
    row.into_iter().map(column_value).collect()
}

pub(crate) fn column_names(columns: &[tiberius::Column]) -> Vec<String> {
    columns.iter().map(|c| c.name().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_becomes_decimal() {
        let v = column_value(ColumnData::Numeric(Some(Numeric::new_with_scale(12345, 2))));
        assert_eq!(v, RowValues::Decimal(Decimal::new(12345, 2)));
    }

    #[test]
    fn nulls_stay_null() {
        assert_eq!(column_value(ColumnData::I32(None)), RowValues::Null);
        assert_eq!(column_value(ColumnData::String(None)), RowValues::Null);
        assert_eq!(column_value(ColumnData::DateTime2(None)), RowValues::Null);
    }

    #[test]
    fn scalar_kinds() {
        assert_eq!(column_value(ColumnData::U8(Some(7))), RowValues::Int(7));
        assert_eq!(column_value(ColumnData::Bit(Some(true))), RowValues::Bool(true));
        assert_eq!(
            column_value(ColumnData::String(Some(Cow::Borrowed("x")))),
            RowValues::Text("x".into())
        );
    }

    #[test]
    fn decimal_round_trips_to_numeric_scale() {
        let n = to_numeric(Decimal::new(-1050, 2));
        assert_eq!(n.value(), -1050);
        assert_eq!(n.scale(), 2);
    }
}
