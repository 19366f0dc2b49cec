//! Batch writer

use futures::future::join_all;
use moka::future::Cache;
use std::sync::Arc;
use tokio::task::JoinHandle;

use super::{BatchReport, RecordOutcome, RecordStatus};
use crate::error::{BindError, StoreError, WriteError};
use crate::schema::{BoundInsert, ColumnValues, Entity, InsertTemplate, PreparedInsert, WriteOptions};
use crate::store::StoreConnection;

/// Default number of prepared inserts kept per writer
pub const DEFAULT_STATEMENT_CACHE_CAPACITY: u64 = 64;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StatementKey {
    query: String,
    options: WriteOptions,
}

/// Writes batches of entities through a shared store connection.
///
/// Prepared inserts are cached per (query, options), so each entity type is
/// prepared once per option set no matter how many batches are written.
/// Concurrent first uses wait on the same preparation; failed preparations
/// are not cached.
pub struct BatchWriter<S: StoreConnection> {
    store: Arc<S>,
    keyspace: String,
    statements: Cache<StatementKey, Arc<PreparedInsert<S::Prepared>>>,
}

impl<S> BatchWriter<S>
where
    S: StoreConnection + 'static,
{
    pub fn new(store: Arc<S>, keyspace: impl Into<String>) -> Self {
        Self::with_statement_cache_capacity(store, keyspace, DEFAULT_STATEMENT_CACHE_CAPACITY)
    }

    pub fn with_statement_cache_capacity(
        store: Arc<S>,
        keyspace: impl Into<String>,
        capacity: u64,
    ) -> Self {
        Self {
            store,
            keyspace: keyspace.into(),
            statements: Cache::new(capacity),
        }
    }

    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    /// Prepared insert for `E`, from cache or prepared now.
    pub async fn prepare<E: Entity>(
        &self,
        options: &WriteOptions,
    ) -> Result<Arc<PreparedInsert<S::Prepared>>, WriteError> {
        let template = InsertTemplate::new(&self.keyspace, &E::schema(), options)?;
        let key = StatementKey {
            query: template.query().to_string(),
            options: options.clone(),
        };
        let store = self.store.clone();

        self.statements
            .try_get_with(key, async move {
                tracing::debug!(query = %template.query(), "Statement cache miss");
                template.prepare(store.as_ref()).await.map(Arc::new)
            })
            .await
            .map_err(|e: Arc<StoreError>| WriteError::Prepare(e.to_string()))
    }

    /// Write every record and return one outcome per record.
    ///
    /// Only fails as a whole when the statement cannot be built or
    /// prepared. Record failures are reported in the [`BatchReport`].
    pub async fn insert_all_outcomes<E: Entity>(
        &self,
        records: &[E],
        options: &WriteOptions,
    ) -> Result<BatchReport, WriteError> {
        let statement = self.prepare::<E>(options).await?;

        // Dispatch everything before waiting on anything
        let dispatched: Vec<(String, Result<JoinHandle<RecordStatus>, BindError>)> = records
            .iter()
            .map(|record| (record.identity(), self.dispatch(&statement, record)))
            .collect();

        let statuses = join_all(dispatched.into_iter().map(|(identity, dispatch)| async move {
            let status = match dispatch {
                Ok(handle) => handle.await.unwrap_or_else(|e| {
                    RecordStatus::Failed(format!("execution task failed: {}", e))
                }),
                Err(e) => RecordStatus::Failed(e.to_string()),
            };
            (identity, status)
        }))
        .await;

        let outcomes: Vec<RecordOutcome> = statuses
            .into_iter()
            .enumerate()
            .map(|(index, (identity, status))| RecordOutcome {
                index,
                identity,
                status,
            })
            .collect();

        for outcome in outcomes.iter().filter(|o| !o.is_applied()) {
            if let RecordStatus::Failed(message) = &outcome.status {
                tracing::warn!(
                    table = %statement.table(),
                    index = outcome.index,
                    identity = %outcome.identity,
                    error = %message,
                    "Record write failed"
                );
            }
        }

        let report = BatchReport::new(outcomes);
        tracing::debug!(
            table = %statement.table(),
            total = report.total(),
            applied = report.applied_count(),
            "Batch complete"
        );

        Ok(report)
    }

    /// Write every record; any failed record fails the batch.
    ///
    /// The error is only returned once every record has completed, and
    /// lists each failed record with the store's error details.
    pub async fn insert_all<E: Entity>(
        &self,
        records: &[E],
        options: &WriteOptions,
    ) -> Result<BatchReport, WriteError> {
        self.insert_all_outcomes(records, options).await?.into_result()
    }

    fn dispatch<E: Entity>(
        &self,
        statement: &Arc<PreparedInsert<S::Prepared>>,
        record: &E,
    ) -> Result<JoinHandle<RecordStatus>, BindError> {
        let mut values = ColumnValues::new();
        record.write_values(&mut values);
        let bound = BoundInsert::new(statement.clone(), values)?;
        let store = self.store.clone();

        Ok(tokio::spawn(async move { execute(store.as_ref(), &bound).await }))
    }
}

async fn execute<S: StoreConnection>(store: &S, bound: &BoundInsert<S::Prepared>) -> RecordStatus {
    match store.execute(bound).await {
        Ok(result) if result.applied => RecordStatus::Applied,
        Ok(result) => RecordStatus::Failed(result.error_message()),
        Err(e) => RecordStatus::Failed(e.to_string()),
    }
}
