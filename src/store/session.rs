//! `scylla` session as a store connection

use async_trait::async_trait;
use scylla::authentication::AuthenticatorProvider;
use scylla::frame::response::result::CqlValue;
use scylla::prepared_statement::PreparedStatement;
use scylla::statement::{Consistency, SerialConsistency};
use scylla::{QueryResult, Session, SessionBuilder};
use std::sync::Arc;

use super::{ExecutionError, ExecutionResult, StoreConnection};
use crate::error::StoreError;
use crate::schema::{BoundInsert, ConsistencyLevel, SerialConsistencyLevel, WriteOptions};
use crate::signer::{SigV4AuthenticatorProvider, SigV4Signer};

impl From<ConsistencyLevel> for Consistency {
    fn from(level: ConsistencyLevel) -> Self {
        match level {
            ConsistencyLevel::Any => Consistency::Any,
            ConsistencyLevel::One => Consistency::One,
            ConsistencyLevel::Two => Consistency::Two,
            ConsistencyLevel::Three => Consistency::Three,
            ConsistencyLevel::Quorum => Consistency::Quorum,
            ConsistencyLevel::All => Consistency::All,
            ConsistencyLevel::LocalQuorum => Consistency::LocalQuorum,
            ConsistencyLevel::EachQuorum => Consistency::EachQuorum,
            ConsistencyLevel::LocalOne => Consistency::LocalOne,
        }
    }
}

impl From<SerialConsistencyLevel> for SerialConsistency {
    fn from(level: SerialConsistencyLevel) -> Self {
        match level {
            SerialConsistencyLevel::Serial => SerialConsistency::Serial,
            SerialConsistencyLevel::LocalSerial => SerialConsistency::LocalSerial,
        }
    }
}

#[async_trait]
impl StoreConnection for Session {
    type Prepared = PreparedStatement;

    async fn prepare(&self, query: &str, options: &WriteOptions) -> Result<PreparedStatement, StoreError> {
        let mut prepared = Session::prepare(self, query.to_string())
            .await
            .map_err(|e| StoreError::Prepare(e.to_string()))?;

        prepared.set_consistency(options.consistency.into());
        prepared.set_is_idempotent(options.is_idempotent());
        if options.if_not_exists {
            prepared.set_serial_consistency(Some(options.serial_consistency.into()));
        }

        Ok(prepared)
    }

    async fn execute(
        &self,
        statement: &BoundInsert<PreparedStatement>,
    ) -> Result<ExecutionResult, StoreError> {
        let result = Session::execute(self, statement.statement().handle(), statement.values().to_vec())
            .await
            .map_err(|e| StoreError::Execute(e.to_string()))?;

        Ok(execution_result(&result))
    }
}

/// Inspect the `[applied]` column conditional writes return.
///
/// Unconditional inserts return no rows and count as applied.
fn execution_result(result: &QueryResult) -> ExecutionResult {
    let first_row = result.rows.as_ref().and_then(|rows| rows.first());

    let row = match first_row {
        Some(row) => row,
        None => return ExecutionResult::applied(),
    };

    match row.columns.first() {
        Some(Some(CqlValue::Boolean(false))) => {
            let mut errors = vec![ExecutionError::new(
                "coordinator",
                format!("conditional write not applied, existing row: {:?}", &row.columns[1..]),
            )];
            errors.extend(
                result
                    .warnings
                    .iter()
                    .map(|warning| ExecutionError::new("warning", warning.clone())),
            );
            ExecutionResult::not_applied(errors)
        }
        _ => ExecutionResult::applied(),
    }
}

/// Session builder with contact points and SigV4 authentication set.
///
/// TLS is left to the caller, which can add it before building.
pub fn session_builder(contact_points: &[String], signer: SigV4Signer) -> SessionBuilder {
    let authenticator: Arc<dyn AuthenticatorProvider> = Arc::new(SigV4AuthenticatorProvider::new(signer));

    SessionBuilder::new()
        .known_nodes(contact_points)
        .authenticator_provider(authenticator)
}

/// Connect a session that signs every new connection with `signer`.
pub async fn connect(contact_points: &[String], signer: SigV4Signer) -> Result<Session, StoreError> {
    tracing::info!(contact_points = ?contact_points, region = %signer.region(), "Connecting to store");

    session_builder(contact_points, signer)
        .build()
        .await
        .map_err(|e| StoreError::Connect(e.to_string()))
}
