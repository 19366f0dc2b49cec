//! Insert statement building and binding

use std::sync::Arc;

use super::entity::{flatten_columns, validate_identifier};
use super::{ColumnValues, CqlValue, EntitySchema, WriteOptions};
use crate::error::{BindError, SchemaError, StoreError, WriteError};
use crate::store::StoreConnection;

/// Render the parameterized insert for an ordered column list.
pub fn insert_query(keyspace: &str, table: &str, columns: &[String], options: &WriteOptions) -> String {
    let placeholders = vec!["?"; columns.len()].join(", ");
    let mut query = format!(
        "INSERT INTO {}.{} ({}) VALUES ({})",
        keyspace,
        table,
        columns.join(", "),
        placeholders
    );

    if options.if_not_exists {
        query.push_str(" IF NOT EXISTS");
    }

    let mut using = Vec::new();
    if let Some(ttl) = options.ttl_seconds {
        using.push(format!("TTL {}", ttl));
    }
    if let Some(timestamp) = options.timestamp_micros {
        using.push(format!("TIMESTAMP {}", timestamp));
    }
    if !using.is_empty() {
        query.push_str(" USING ");
        query.push_str(&using.join(" AND "));
    }

    query
}

/// A validated, not yet prepared, insert.
///
/// Creating one flattens the schema, so schema errors surface here and
/// never at bind time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertTemplate {
    table: String,
    columns: Vec<String>,
    query: String,
    options: WriteOptions,
}

impl InsertTemplate {
    pub fn new(keyspace: &str, schema: &EntitySchema, options: &WriteOptions) -> Result<Self, SchemaError> {
        validate_identifier(keyspace)?;
        let columns = flatten_columns(schema)?;
        let query = insert_query(keyspace, schema.table(), &columns, options);

        Ok(Self {
            table: format!("{}.{}", keyspace, schema.table()),
            columns,
            query,
            options: options.clone(),
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// One prepare round-trip against the store.
    pub async fn prepare<S>(self, store: &S) -> Result<PreparedInsert<S::Prepared>, StoreError>
    where
        S: StoreConnection + ?Sized,
    {
        let handle = store.prepare(&self.query, &self.options).await?;

        tracing::debug!(table = %self.table, columns = self.columns.len(), "Prepared insert");

        Ok(PreparedInsert {
            template: self,
            handle,
        })
    }
}

/// Prepared insert, reusable for any number of concurrent binds.
#[derive(Debug)]
pub struct PreparedInsert<P> {
    template: InsertTemplate,
    handle: P,
}

impl<P> PreparedInsert<P> {
    /// Qualified `keyspace.table`
    pub fn table(&self) -> &str {
        &self.template.table
    }

    pub fn columns(&self) -> &[String] {
        &self.template.columns
    }

    pub fn query(&self) -> &str {
        &self.template.query
    }

    pub fn options(&self) -> &WriteOptions {
        &self.template.options
    }

    pub fn handle(&self) -> &P {
        &self.handle
    }

    /// Order `values` to match the statement columns.
    pub fn bind_values(&self, mut values: ColumnValues) -> Result<Vec<Option<CqlValue>>, BindError> {
        let bound = self
            .columns()
            .iter()
            .map(|column| {
                values
                    .take(column)
                    .ok_or_else(|| BindError::MissingColumn(column.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        match values.into_column_names().min() {
            Some(unknown) => Err(BindError::UnknownColumn(unknown)),
            None => Ok(bound),
        }
    }
}

/// Prepare the insert for `schema` in one step.
pub async fn build_insert_statement<S>(
    store: &S,
    keyspace: &str,
    schema: &EntitySchema,
    options: &WriteOptions,
) -> Result<PreparedInsert<S::Prepared>, WriteError>
where
    S: StoreConnection + ?Sized,
{
    InsertTemplate::new(keyspace, schema, options)?
        .prepare(store)
        .await
        .map_err(|e| WriteError::Prepare(e.to_string()))
}

/// A prepared insert plus one record's values, in column order.
#[derive(Debug)]
pub struct BoundInsert<P> {
    statement: Arc<PreparedInsert<P>>,
    values: Vec<Option<CqlValue>>,
}

impl<P> BoundInsert<P> {
    pub fn new(statement: Arc<PreparedInsert<P>>, values: ColumnValues) -> Result<Self, BindError> {
        let values = statement.bind_values(values)?;
        Ok(Self { statement, values })
    }

    pub fn statement(&self) -> &PreparedInsert<P> {
        &self.statement
    }

    pub fn values(&self) -> &[Option<CqlValue>] {
        &self.values
    }
}
