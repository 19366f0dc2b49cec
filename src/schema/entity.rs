//! Entity mapping capability

use std::collections::{HashMap, HashSet};

use super::CqlValue;
use crate::error::SchemaError;

/// One declared field of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SchemaField {
    /// Maps to a single column
    Plain { column: String },
    /// Composite key group, flattened into its own fields in place
    Composite { name: String, fields: Vec<SchemaField> },
}

impl SchemaField {
    pub fn plain(column: impl Into<String>) -> Self {
        SchemaField::Plain {
            column: column.into(),
        }
    }

    pub fn composite(name: impl Into<String>, fields: Vec<SchemaField>) -> Self {
        SchemaField::Composite {
            name: name.into(),
            fields,
        }
    }
}

/// Column layout of a record type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntitySchema {
    table: String,
    fields: Vec<SchemaField>,
}

impl EntitySchema {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            fields: Vec::new(),
        }
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.fields.push(SchemaField::plain(column));
        self
    }

    pub fn composite(mut self, name: impl Into<String>, fields: Vec<SchemaField>) -> Self {
        self.fields.push(SchemaField::composite(name, fields));
        self
    }

    /// Add a composite group described by a [`CompositeKey`] type
    pub fn composite_key<K: CompositeKey>(self, name: impl Into<String>) -> Self {
        self.composite(name, K::fields())
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }
}

/// A record type that can be written by the batch writer.
pub trait Entity: Send + Sync {
    /// Column layout. Must describe the same columns on every call.
    fn schema() -> EntitySchema
    where
        Self: Sized;

    /// Write this record's column values, keyed by column name.
    fn write_values(&self, values: &mut ColumnValues);

    /// Human-readable identity used in failure reports.
    fn identity(&self) -> String;
}

/// A group of fields forming a composite primary key.
pub trait CompositeKey {
    fn fields() -> Vec<SchemaField>;

    fn write_values(&self, values: &mut ColumnValues);
}

/// Column values of one record. `None` binds a null.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnValues {
    values: HashMap<String, Option<CqlValue>>,
}

impl ColumnValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: impl Into<String>, value: CqlValue) -> &mut Self {
        self.values.insert(column.into(), Some(value));
        self
    }

    pub fn set_null(&mut self, column: impl Into<String>) -> &mut Self {
        self.values.insert(column.into(), None);
        self
    }

    pub fn set_opt(&mut self, column: impl Into<String>, value: Option<CqlValue>) -> &mut Self {
        self.values.insert(column.into(), value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&Option<CqlValue>> {
        self.values.get(column)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn take(&mut self, column: &str) -> Option<Option<CqlValue>> {
        self.values.remove(column)
    }

    pub(crate) fn into_column_names(self) -> impl Iterator<Item = String> {
        self.values.into_keys()
    }
}

/// Flatten a schema into its ordered column list.
///
/// Composite groups expand in place, recursively, keeping their own
/// declaration order.
pub fn flatten_columns(schema: &EntitySchema) -> Result<Vec<String>, SchemaError> {
    validate_identifier(&schema.table)?;

    let mut columns = Vec::new();
    let mut seen = HashSet::new();
    flatten_into(&schema.table, &schema.fields, &mut columns, &mut seen)?;

    if columns.is_empty() {
        return Err(SchemaError::NoColumns(schema.table.clone()));
    }
    Ok(columns)
}

fn flatten_into(
    table: &str,
    fields: &[SchemaField],
    columns: &mut Vec<String>,
    seen: &mut HashSet<String>,
) -> Result<(), SchemaError> {
    for field in fields {
        match field {
            SchemaField::Plain { column } => {
                validate_identifier(column)?;
                // Unquoted CQL identifiers are case-insensitive
                if !seen.insert(column.to_lowercase()) {
                    return Err(SchemaError::DuplicateColumn {
                        table: table.to_string(),
                        column: column.clone(),
                    });
                }
                columns.push(column.clone());
            }
            SchemaField::Composite { name, fields } => {
                if fields.is_empty() {
                    return Err(SchemaError::EmptyComposite {
                        table: table.to_string(),
                        field: name.clone(),
                    });
                }
                flatten_into(table, fields, columns, seen)?;
            }
        }
    }
    Ok(())
}

pub(crate) fn validate_identifier(name: &str) -> Result<(), SchemaError> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ReadingKey, SensorReading};

    #[test]
    fn test_composite_key_flattened_first() {
        let columns = flatten_columns(&SensorReading::schema()).unwrap();
        assert_eq!(
            columns,
            vec!["device_id", "day", "reading_time", "value", "unit"]
        );
    }

    #[test]
    fn test_flattening_is_deterministic() {
        let first = flatten_columns(&SensorReading::schema()).unwrap();
        for _ in 0..10 {
            assert_eq!(flatten_columns(&SensorReading::schema()).unwrap(), first);
        }
    }

    #[test]
    fn test_nested_composite_keeps_declaration_order() {
        let schema = EntitySchema::new("events")
            .column("tenant")
            .composite(
                "key",
                vec![
                    SchemaField::plain("a"),
                    SchemaField::composite("inner", vec![SchemaField::plain("b"), SchemaField::plain("c")]),
                    SchemaField::plain("d"),
                ],
            )
            .column("payload");

        assert_eq!(
            flatten_columns(&schema).unwrap(),
            vec!["tenant", "a", "b", "c", "d", "payload"]
        );
    }

    #[test]
    fn test_composite_key_type_registration() {
        let schema = EntitySchema::new("readings").composite_key::<ReadingKey>("key");
        assert_eq!(flatten_columns(&schema).unwrap(), vec!["device_id", "day"]);
    }

    #[test]
    fn test_empty_schema_rejected() {
        let err = flatten_columns(&EntitySchema::new("empty")).unwrap_err();
        assert_eq!(err, SchemaError::NoColumns("empty".to_string()));
    }

    #[test]
    fn test_empty_composite_rejected() {
        let schema = EntitySchema::new("t").composite("key", vec![]).column("v");
        assert!(matches!(
            flatten_columns(&schema),
            Err(SchemaError::EmptyComposite { field, .. }) if field == "key"
        ));
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let schema = EntitySchema::new("t")
            .composite("key", vec![SchemaField::plain("id")])
            .column("ID");
        assert!(matches!(
            flatten_columns(&schema),
            Err(SchemaError::DuplicateColumn { .. })
        ));
    }

    #[test]
    fn test_invalid_identifiers_rejected() {
        let schema = EntitySchema::new("t").column("value; DROP TABLE t");
        assert!(matches!(
            flatten_columns(&schema),
            Err(SchemaError::InvalidIdentifier(_))
        ));

        let schema = EntitySchema::new("1table").column("v");
        assert!(matches!(
            flatten_columns(&schema),
            Err(SchemaError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_column_values_set_and_null() {
        let mut values = ColumnValues::new();
        values
            .set("id", CqlValue::Text("a".into()))
            .set_null("note");

        assert_eq!(values.len(), 2);
        assert_eq!(values.get("id"), Some(&Some(CqlValue::Text("a".into()))));
        assert_eq!(values.get("note"), Some(&None));
    }
}
