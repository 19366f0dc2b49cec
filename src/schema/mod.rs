//! Entity schemas and insert statements
//!
//! Record types describe their columns with an [`EntitySchema`]; composite
//! keys are nested groups flattened in declaration order. The flattened order
//! is used both for the prepared statement and for every bind.

mod entity;
mod options;
mod statement;

pub use entity::{flatten_columns, ColumnValues, CompositeKey, Entity, EntitySchema, SchemaField};
pub use options::{ConsistencyLevel, SerialConsistencyLevel, WriteOptions};
pub use statement::{build_insert_statement, insert_query, BoundInsert, InsertTemplate, PreparedInsert};

pub use scylla::frame::response::result::CqlValue;
