//! Row-to-record mapping.
//!
//! A record type describes its fields once through [`MapRow::describe`]; the
//! resulting [`RowSchema`] is cached per type and bound against each result set's
//! columns by name. Columns the record does not name are ignored, fields without
//! a column keep their default, and a `Null` column sets the field's
//! null-equivalent.
//!
//! ```rust
//! use sql_provider::prelude::*;
//!
//! #[derive(Debug, Default)]
//! struct Account {
//!     id: i32,
//!     name: Option<String>,
//!     balance: rust_decimal::Decimal,
//! }
//!
//! sql_provider::map_row!(Account {
//!     id => "Id",
//!     name => "Name",
//!     balance => "Balance",
//! });
//!
//! let schema = schema_of::<Account>();
//! assert_eq!(schema.len(), 3);
//! ```

mod field;
mod schema;

pub use field::SqlField;
pub use schema::{FieldDescriptor, RowSchema, schema_of};

pub(crate) use schema::RowPlan;

use crate::error::SqlProviderError;
use crate::results::{CustomDbRow, ResultSet};

/// A record the row mapper can construct.
pub trait MapRow: Default + Send + 'static {
    /// Register the record's fields. Called once per type per process.
    fn describe(schema: &mut RowSchema<Self>);
}

/// What a failed field conversion does to the row being mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MappingMode {
    /// Leave the field at its default and keep going.
    #[default]
    BestEffort,
    /// Fail the row with [`SqlProviderError::Mapping`].
    Strict,
}

/// Implement [`MapRow`] for a struct by listing `field => "Column"` pairs.
///
/// Fields must implement [`SqlField`]; register anything else by hand with
/// [`RowSchema::opaque_field`].
#[macro_export]
macro_rules! map_row {
    ($ty:ty { $($field:ident => $column:expr),+ $(,)? }) => {
        impl $crate::mapping::MapRow for $ty {
            fn describe(schema: &mut $crate::mapping::RowSchema<Self>) {
                $(
                    schema.field($column, |r| &r.$field, |r| &mut r.$field);
                )+
            }
        }
    };
}

impl CustomDbRow {
    /// Map this row into `T`.
    ///
    /// # Errors
    /// Only in [`MappingMode::Strict`], when a field fails to convert.
    pub fn map_to<T: MapRow>(&self, mode: MappingMode) -> Result<T, SqlProviderError> {
        RowPlan::<T>::new(&self.column_names, &self.column_index_cache, mode).map(&self.rows)
    }
}

impl ResultSet {
    /// Map every row into `T`, binding columns once for the whole set.
    ///
    /// # Errors
    /// Only in [`MappingMode::Strict`], when a field fails to convert.
    pub fn map_rows<T: MapRow>(&self, mode: MappingMode) -> Result<Vec<T>, SqlProviderError> {
        let Some(first) = self.results.first() else {
            return Ok(Vec::new());
        };
        let plan = RowPlan::<T>::new(&first.column_names, &first.column_index_cache, mode);
        self.results.iter().map(|row| plan.map(&row.rows)).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDateTime;

    use super::*;
    use crate::test_utils::create_test_row;
    use crate::types::{DbType, RowValues, min_datetime};

    #[derive(Debug, Default, PartialEq)]
    struct Person {
        id: i32,
        name: Option<String>,
        extra: String,
    }

    crate::map_row!(Person {
        id => "Id",
        name => "Name",
        extra => "Extra",
    });

    #[derive(Debug, Default)]
    struct Stamped {
        created: NaiveDateTime,
        count: u8,
        payload: Vec<u8>,
    }

    impl MapRow for Stamped {
        fn describe(schema: &mut RowSchema<Self>) {
            schema
                .field("created", |r| &r.created, |r| &mut r.created)
                .field("count", |r| &r.count, |r| &mut r.count)
                .opaque_field("payload", |r| RowValues::Blob(r.payload.clone()));
        }
    }

    fn row(columns: &[&str], values: Vec<RowValues>) -> CustomDbRow {
        create_test_row(columns.iter().map(ToString::to_string).collect(), values)
    }

    #[test]
    fn missing_columns_are_skipped_and_nulls_clear() {
        let r = row(
            &["id", "name", "unused"],
            vec![RowValues::Int(7), RowValues::Null, RowValues::Bool(true)],
        );
        let person: Person = r.map_to(MappingMode::BestEffort).unwrap();
        assert_eq!(
            person,
            Person {
                id: 7,
                name: None,
                extra: String::new()
            }
        );

        let r = row(&["ID", "NAME"], vec![RowValues::Int(8), RowValues::Text("ann".into())]);
        let person: Person = r.map_to(MappingMode::BestEffort).unwrap();
        assert_eq!(person.name.as_deref(), Some("ann"));
    }

    #[test]
    fn best_effort_swallows_and_strict_reports() {
        let r = row(
            &["Id", "Name"],
            vec![RowValues::Text("not a number".into()), RowValues::Text("bo".into())],
        );
        let person: Person = r.map_to(MappingMode::BestEffort).unwrap();
        assert_eq!(person.id, 0);
        assert_eq!(person.name.as_deref(), Some("bo"));

        let err = r.map_to::<Person>(MappingMode::Strict).unwrap_err();
        assert!(matches!(err, SqlProviderError::Mapping { ref field, .. } if field == "Id"));
    }

    #[test]
    fn short_rows_leave_defaults() {
        let r = create_test_row(vec!["Id".into(), "Name".into()], vec![RowValues::Int(3)]);
        let person: Person = r.map_to(MappingMode::BestEffort).unwrap();
        assert_eq!(person.id, 3);
        assert_eq!(person.name, None);
    }

    #[test]
    fn zero_dates_and_opaque_fields() {
        let r = row(
            &["created", "count", "payload"],
            vec![
                RowValues::InvalidTimestamp("0000-00-00 00:00:00".into()),
                RowValues::Int(4),
                RowValues::Blob(vec![1, 2]),
            ],
        );
        let stamped: Stamped = r.map_to(MappingMode::Strict).unwrap();
        assert_eq!(stamped.created, min_datetime());
        assert_eq!(stamped.count, 4);
        assert!(stamped.payload.is_empty());

        let schema = schema_of::<Stamped>();
        let payload = &schema.fields()[2];
        assert!(payload.is_opaque());
        assert_eq!(payload.db_type(), DbType::Object);
    }

    #[test]
    fn schema_is_cached_per_type() {
        let a = schema_of::<Person>();
        let b = schema_of::<Person>();
        assert!(Arc::ptr_eq(&a, &b));
        let names: Vec<&str> = a.fields().iter().map(FieldDescriptor::name).collect();
        assert_eq!(names, vec!["Id", "Name", "Extra"]);
        assert_eq!(a.fields()[1].db_type(), DbType::String);
    }

    #[test]
    fn result_sets_map_every_row() {
        let mut rs = ResultSet::with_capacity(2);
        rs.set_column_names(Arc::new(vec!["Id".into()]));
        rs.add_row_values(vec![RowValues::Int(1)]);
        rs.add_row_values(vec![RowValues::Int(2)]);
        let people: Vec<Person> = rs.map_rows(MappingMode::BestEffort).unwrap();
        assert_eq!(people.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 2]);
    }
}
