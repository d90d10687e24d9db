use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use tracing::trace;

use super::field::SqlField;
use super::{MapRow, MappingMode};
use crate::error::SqlProviderError;
use crate::results::{ColumnIndex, lookup_column};
use crate::types::{DbType, RowValues};

type Getter<T> = Box<dyn Fn(&T) -> RowValues + Send + Sync>;
type Setter<T> = Box<dyn Fn(&mut T, &RowValues) -> Result<(), String> + Send + Sync>;

/// One registered field: column name, type tag and accessors.
pub struct FieldDescriptor<T> {
    name: &'static str,
    db_type: DbType,
    get: Getter<T>,
    set: Option<Setter<T>>,
}

impl<T> FieldDescriptor<T> {
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn db_type(&self) -> DbType {
        self.db_type
    }

    /// Opaque fields are written by inserts but never filled from rows.
    #[must_use]
    pub fn is_opaque(&self) -> bool {
        self.set.is_none()
    }

    #[must_use]
    pub fn value(&self, record: &T) -> RowValues {
        (self.get)(record)
    }
}

impl<T> std::fmt::Debug for FieldDescriptor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("db_type", &self.db_type)
            .field("opaque", &self.is_opaque())
            .finish()
    }
}

/// Field list of a mapped record type, in declaration order.
///
/// Built once per type by [`MapRow::describe`] and cached for the life of the
/// process; see [`schema_of`].
pub struct RowSchema<T> {
    fields: Vec<FieldDescriptor<T>>,
}

impl<T> std::fmt::Debug for RowSchema<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(&self.fields).finish()
    }
}

impl<T: 'static> RowSchema<T> {
    pub(crate) fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Register a mapped field bound to the column `name`.
    pub fn field<F: SqlField + 'static>(
        &mut self,
        name: &'static str,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> &mut Self {
        self.fields.push(FieldDescriptor {
            name,
            db_type: F::DB_TYPE,
            get: Box::new(move |record: &T| get(record).to_row_value()),
            set: Some(Box::new(move |record: &mut T, value: &RowValues| {
                *get_mut(record) = F::from_row_value(value)?;
                Ok(())
            })),
        });
        self
    }

    /// Register a field of a type the mapper does not convert. It binds as
    /// `DbType::Object` on inserts and is left untouched when mapping rows.
    pub fn opaque_field(&mut self, name: &'static str, get: fn(&T) -> RowValues) -> &mut Self {
        self.fields.push(FieldDescriptor {
            name,
            db_type: DbType::Object,
            get: Box::new(get),
            set: None,
        });
        self
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor<T>] {
        &self.fields
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

static SCHEMAS: LazyLock<RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

fn describe<T: MapRow>() -> RowSchema<T> {
    let mut schema = RowSchema::new();
    T::describe(&mut schema);
    schema
}

/// The cached schema for `T`, describing the type on first use.
#[must_use]
pub fn schema_of<T: MapRow>() -> Arc<RowSchema<T>> {
    let key = TypeId::of::<T>();
    let cached = SCHEMAS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
        .cloned();

    let entry = match cached {
        Some(entry) => entry,
        None => {
            // describe outside the lock; a racing thread's schema wins
            let built: Arc<dyn Any + Send + Sync> = Arc::new(describe::<T>());
            SCHEMAS
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(key)
                .or_insert(built)
                .clone()
        }
    };
    entry
        .downcast::<RowSchema<T>>()
        .unwrap_or_else(|_| Arc::new(describe::<T>()))
}

/// Field-to-ordinal bindings of one schema against one result set's columns.
pub(crate) struct RowPlan<T: MapRow> {
    schema: Arc<RowSchema<T>>,
    ordinals: Vec<Option<usize>>,
    mode: MappingMode,
}

impl<T: MapRow> RowPlan<T> {
    pub(crate) fn new(column_names: &[String], index: &ColumnIndex, mode: MappingMode) -> Self {
        let schema = schema_of::<T>();
        let ordinals = schema
            .fields
            .iter()
            .map(|field| {
                if field.is_opaque() {
                    return None;
                }
                let ordinal = lookup_column(column_names, index, field.name);
                if ordinal.is_none() {
                    trace!(field = field.name, "no such column; field keeps its default");
                }
                ordinal
            })
            .collect();
        Self {
            schema,
            ordinals,
            mode,
        }
    }

    /// Build one record from a row's values.
    ///
    /// # Errors
    /// In strict mode, returns `Mapping` for the first field that fails to convert
    /// or whose ordinal is past the end of the row.
    pub(crate) fn map(&self, row: &[RowValues]) -> Result<T, SqlProviderError> {
        let mut record = T::default();
        for (field, ordinal) in self.schema.fields.iter().zip(&self.ordinals) {
            let (Some(ordinal), Some(set)) = (ordinal, &field.set) else {
                continue;
            };
            let outcome = match row.get(*ordinal) {
                Some(value) => set(&mut record, value),
                None => Err(format!("ordinal {ordinal} is out of range")),
            };
            if let Err(reason) = outcome {
                match self.mode {
                    MappingMode::BestEffort => {
                        trace!(field = field.name, %reason, "field conversion failed; keeping default");
                    }
                    MappingMode::Strict => {
                        return Err(SqlProviderError::Mapping {
                            field: field.name.to_string(),
                            reason,
                        });
                    }
                }
            }
        }
        Ok(record)
    }
}
