use crate::types::{DatabaseType, DbType, ParameterDirection, RowValues};

/// A bound parameter in provider-neutral form.
///
/// `native_type` is the backend type name the parameter binds as (for example
/// `NVARCHAR(MAX)` on SQL Server); it is filled in by the backend's
/// [`ParameterFactory`].
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub database_type: DatabaseType,
    pub name: String,
    pub direction: ParameterDirection,
    pub db_type: DbType,
    pub nullable: bool,
    pub value: RowValues,
    pub native_type: &'static str,
}

impl Parameter {
    /// Name without the leading `@` or surrounding whitespace; used for matching
    /// placeholders and output columns.
    #[must_use]
    pub fn bare_name(&self) -> &str {
        bare_name(&self.name)
    }

    #[must_use]
    pub fn is_input(&self) -> bool {
        self.direction.is_input()
    }

    #[must_use]
    pub fn is_output(&self) -> bool {
        self.direction.is_output()
    }
}

pub(crate) fn bare_name(name: &str) -> &str {
    name.trim().trim_start_matches('@')
}

/// Builds provider-specific parameters.
///
/// Construction is pure: values are carried uninterpreted, and direction and
/// nullability are always set explicitly. Returned parameters are not attached to
/// any command.
pub trait ParameterFactory: Send + Sync {
    fn database_type(&self) -> DatabaseType;

    /// Backend type name for a provider-neutral type tag.
    fn native_type_name(&self, db_type: DbType) -> &'static str;

    fn create_parameter(
        &self,
        name: &str,
        value: RowValues,
        db_type: DbType,
        direction: ParameterDirection,
        nullable: bool,
    ) -> Parameter {
        Parameter {
            database_type: self.database_type(),
            name: name.to_string(),
            direction,
            db_type,
            nullable,
            value,
            native_type: self.native_type_name(db_type),
        }
    }

    fn create_input_parameter(
        &self,
        name: &str,
        value: RowValues,
        db_type: DbType,
        nullable: bool,
    ) -> Parameter {
        self.create_parameter(name, value, db_type, ParameterDirection::Input, nullable)
    }

    fn create_output_parameter(&self, name: &str, db_type: DbType, nullable: bool) -> Parameter {
        self.create_parameter(
            name,
            RowValues::Null,
            db_type,
            ParameterDirection::Output,
            nullable,
        )
    }

    fn create_empty_parameter(&self) -> Parameter {
        self.create_parameter(
            "",
            RowValues::Null,
            DbType::Object,
            ParameterDirection::Input,
            true,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain;

    impl ParameterFactory for Plain {
        fn database_type(&self) -> DatabaseType {
            DatabaseType::MySql
        }

        fn native_type_name(&self, _db_type: DbType) -> &'static str {
            "ANY"
        }
    }

    #[test]
    fn output_parameter_has_null_value() {
        let p = Plain.create_output_parameter("@total", DbType::Int32, false);
        assert_eq!(p.direction, ParameterDirection::Output);
        assert!(p.value.is_null());
        assert!(!p.nullable);
        assert_eq!(p.name, "@total");
        assert_eq!(p.bare_name(), "total");
    }

    #[test]
    fn empty_parameter_defaults() {
        let p = Plain.create_empty_parameter();
        assert_eq!(p.db_type, DbType::Object);
        assert!(p.nullable);
        assert!(p.is_input());
    }
}
