use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use uuid::Uuid;

use crate::types::{DbType, RowValues, min_datetime};

/// A record field type the row mapper knows how to fill and the text-insert
/// builder knows how to bind.
///
/// `from_row_value` receives `Null` too: plain types map it to their zero value
/// (the minimum date for date-times), `Option<_>` maps it to `None`. A returned `Err` is a per-field conversion
/// failure; the mapping mode decides whether it aborts the row.
pub trait SqlField: Sized {
    const DB_TYPE: DbType;

    /// Convert a column value into the field type.
    ///
    /// # Errors
    /// Returns a short reason when the value cannot represent this type.
    fn from_row_value(value: &RowValues) -> Result<Self, String>;

    fn to_row_value(&self) -> RowValues;
}

fn mismatch(expected: &str, value: &RowValues) -> String {
    format!("cannot read {value:?} as {expected}")
}

macro_rules! impl_integer_field {
    ($t:ty, $db:expr, $name:literal) => {
        impl SqlField for $t {
            const DB_TYPE: DbType = $db;

            fn from_row_value(value: &RowValues) -> Result<Self, String> {
                match value {
                    RowValues::Null => Ok(0),
                    RowValues::Int(i) => <$t>::try_from(*i).map_err(|_| format!("{i} is out of range for {}", $name)),
                    RowValues::Bool(b) => Ok(<$t>::from(*b)),
                    RowValues::Decimal(d) if d.fract().is_zero() => d
                        .to_i64()
                        .and_then(|i| <$t>::try_from(i).ok())
                        .ok_or_else(|| format!("{d} is out of range for {}", $name)),
                    RowValues::Text(s) => s.trim().parse::<$t>().map_err(|e| e.to_string()),
                    other => Err(mismatch($name, other)),
                }
            }

            fn to_row_value(&self) -> RowValues {
                RowValues::Int(i64::from(*self))
            }
        }
    };
}

impl_integer_field!(i16, DbType::Int16, "i16");
impl_integer_field!(i32, DbType::Int32, "i32");
impl_integer_field!(i64, DbType::Int64, "i64");
impl_integer_field!(u8, DbType::Byte, "u8");

impl SqlField for bool {
    const DB_TYPE: DbType = DbType::Boolean;

    fn from_row_value(value: &RowValues) -> Result<Self, String> {
        match value {
            RowValues::Null => Ok(false),
            RowValues::Bool(b) => Ok(*b),
            // TINYINT(1) and BIT columns
            RowValues::Int(i) => Ok(*i != 0),
            RowValues::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "true" => Ok(true),
                "0" | "false" => Ok(false),
                _ => Err(mismatch("bool", value)),
            },
            RowValues::Blob(b) if b.len() == 1 => Ok(b[0] != 0),
            other => Err(mismatch("bool", other)),
        }
    }

    fn to_row_value(&self) -> RowValues {
        RowValues::Bool(*self)
    }
}

impl SqlField for char {
    const DB_TYPE: DbType = DbType::AnsiStringFixedLength;

    fn from_row_value(value: &RowValues) -> Result<Self, String> {
        match value {
            RowValues::Null => Ok('\0'),
            RowValues::Text(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(mismatch("char", value)),
                }
            }
            RowValues::Int(i) => u32::try_from(*i)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| mismatch("char", value)),
            other => Err(mismatch("char", other)),
        }
    }

    fn to_row_value(&self) -> RowValues {
        RowValues::Text(self.to_string())
    }
}

impl SqlField for NaiveDateTime {
    const DB_TYPE: DbType = DbType::DateTime;

    fn from_row_value(value: &RowValues) -> Result<Self, String> {
        match value {
            RowValues::Null => Ok(min_datetime()),
            RowValues::Timestamp(dt) => Ok(*dt),
            RowValues::InvalidTimestamp(_) => Ok(min_datetime()),
            RowValues::Text(s) => parse_datetime_text(s).ok_or_else(|| mismatch("datetime", value)),
            other => Err(mismatch("datetime", other)),
        }
    }

    fn to_row_value(&self) -> RowValues {
        RowValues::Timestamp(*self)
    }
}

fn parse_datetime_text(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

impl SqlField for Decimal {
    const DB_TYPE: DbType = DbType::Decimal;

    fn from_row_value(value: &RowValues) -> Result<Self, String> {
        match value {
            RowValues::Null => Ok(Decimal::ZERO),
            RowValues::Decimal(d) => Ok(*d),
            RowValues::Int(i) => Ok(Decimal::from(*i)),
            RowValues::Float(f) => Decimal::try_from(*f).map_err(|e| e.to_string()),
            RowValues::Text(s) => s.trim().parse::<Decimal>().map_err(|e| e.to_string()),
            other => Err(mismatch("decimal", other)),
        }
    }

    fn to_row_value(&self) -> RowValues {
        RowValues::Decimal(*self)
    }
}

impl SqlField for f64 {
    const DB_TYPE: DbType = DbType::Double;

    fn from_row_value(value: &RowValues) -> Result<Self, String> {
        match value {
            RowValues::Null => Ok(0.0),
            RowValues::Float(f) => Ok(*f),
            #[allow(clippy::cast_precision_loss)]
            RowValues::Int(i) => Ok(*i as f64),
            RowValues::Decimal(d) => d.to_f64().ok_or_else(|| mismatch("f64", value)),
            RowValues::Text(s) => s.trim().parse::<f64>().map_err(|e| e.to_string()),
            other => Err(mismatch("f64", other)),
        }
    }

    fn to_row_value(&self) -> RowValues {
        RowValues::Float(*self)
    }
}

impl SqlField for f32 {
    const DB_TYPE: DbType = DbType::Single;

    fn from_row_value(value: &RowValues) -> Result<Self, String> {
        match value {
            #[allow(clippy::cast_possible_truncation)]
            RowValues::Float(f) if f.is_finite() && f.abs() <= f64::from(f32::MAX) => Ok(*f as f32),
            RowValues::Float(_) => Err(mismatch("f32", value)),
            RowValues::Decimal(d) => d.to_f32().ok_or_else(|| mismatch("f32", value)),
            RowValues::Text(s) => s.trim().parse::<f32>().map_err(|e| e.to_string()),
            #[allow(clippy::cast_precision_loss)]
            RowValues::Int(i) => Ok(*i as f32),
            RowValues::Null => Ok(0.0),
            other => Err(mismatch("f32", other)),
        }
    }

    fn to_row_value(&self) -> RowValues {
        RowValues::Float(f64::from(*self))
    }
}

impl SqlField for Uuid {
    const DB_TYPE: DbType = DbType::Guid;

    fn from_row_value(value: &RowValues) -> Result<Self, String> {
        match value {
            RowValues::Null => Ok(Uuid::nil()),
            RowValues::Uuid(u) => Ok(*u),
            RowValues::Text(s) => Uuid::parse_str(s.trim()).map_err(|e| e.to_string()),
            // BINARY(16) columns
            RowValues::Blob(b) => Uuid::from_slice(b).map_err(|e| e.to_string()),
            other => Err(mismatch("uuid", other)),
        }
    }

    fn to_row_value(&self) -> RowValues {
        RowValues::Uuid(*self)
    }
}

impl SqlField for String {
    const DB_TYPE: DbType = DbType::String;

    fn from_row_value(value: &RowValues) -> Result<Self, String> {
        match value {
            RowValues::Null => Ok(String::new()),
            RowValues::Text(s) => Ok(s.clone()),
            RowValues::JSON(json) => Ok(json.to_string()),
            RowValues::Uuid(u) => Ok(u.hyphenated().to_string()),
            other => Err(mismatch("string", other)),
        }
    }

    fn to_row_value(&self) -> RowValues {
        RowValues::Text(self.clone())
    }
}

impl<F: SqlField> SqlField for Option<F> {
    const DB_TYPE: DbType = F::DB_TYPE;

    fn from_row_value(value: &RowValues) -> Result<Self, String> {
        if value.is_null() {
            Ok(None)
        } else {
            F::from_row_value(value).map(Some)
        }
    }

    fn to_row_value(&self) -> RowValues {
        self.as_ref().map_or(RowValues::Null, SqlField::to_row_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nulls_become_defaults_or_none() {
        assert_eq!(i32::from_row_value(&RowValues::Null), Ok(0));
        assert_eq!(String::from_row_value(&RowValues::Null), Ok(String::new()));
        assert_eq!(Option::<String>::from_row_value(&RowValues::Null), Ok(None));
        assert_eq!(
            Option::<i64>::from_row_value(&RowValues::Int(5)),
            Ok(Some(5))
        );
    }

    #[test]
    fn narrowing_is_range_checked() {
        assert_eq!(i16::from_row_value(&RowValues::Int(300)), Ok(300));
        assert!(u8::from_row_value(&RowValues::Int(300)).is_err());
        assert!(i32::from_row_value(&RowValues::Int(i64::MAX)).is_err());
        assert_eq!(
            i64::from_row_value(&RowValues::Decimal(Decimal::new(4200, 2))),
            Ok(42)
        );
        assert!(i64::from_row_value(&RowValues::Decimal(Decimal::new(4250, 2))).is_err());
    }

    #[test]
    fn invalid_timestamp_maps_to_minimum() {
        let v = RowValues::InvalidTimestamp("0000-00-00 00:00:00".into());
        assert_eq!(NaiveDateTime::from_row_value(&v), Ok(min_datetime()));
        assert_eq!(
            Option::<NaiveDateTime>::from_row_value(&v),
            Ok(Some(min_datetime()))
        );
    }

    #[test]
    fn datetime_from_text() {
        let dt = NaiveDateTime::from_row_value(&RowValues::Text("2024-02-29 13:45:00".into())).unwrap();
        assert_eq!(dt.to_string(), "2024-02-29 13:45:00");
        assert!(NaiveDateTime::from_row_value(&RowValues::Int(1)).is_err());
    }

    #[test]
    fn tinyint_reads_as_bool() {
        assert_eq!(bool::from_row_value(&RowValues::Int(1)), Ok(true));
        assert_eq!(bool::from_row_value(&RowValues::Text("0".into())), Ok(false));
        assert!(bool::from_row_value(&RowValues::Float(1.0)).is_err());
    }

    #[test]
    fn char_requires_exactly_one() {
        assert_eq!(char::from_row_value(&RowValues::Text("Y".into())), Ok('Y'));
        assert!(char::from_row_value(&RowValues::Text("YN".into())).is_err());
    }

    #[test]
    fn string_does_not_stringify_numbers() {
        assert!(String::from_row_value(&RowValues::Int(5)).is_err());
    }

    #[test]
    fn type_tags() {
        assert_eq!(<f32 as SqlField>::DB_TYPE, DbType::Single);
        assert_eq!(<Option<Uuid> as SqlField>::DB_TYPE, DbType::Guid);
        assert_eq!(<char as SqlField>::DB_TYPE, DbType::AnsiStringFixedLength);
        assert_eq!(Some(3_i16).to_row_value(), RowValues::Int(3));
        assert_eq!(Option::<i16>::None.to_row_value(), RowValues::Null);
    }
}
