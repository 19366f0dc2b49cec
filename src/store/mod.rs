//! Store connection
//!
//! The batch writer talks to the database through [`StoreConnection`]. The
//! `scylla` session implements it; tests use an in-memory double.

mod session;

use async_trait::async_trait;
use std::fmt;

use crate::error::StoreError;
use crate::schema::{BoundInsert, WriteOptions};

pub use session::{connect, session_builder};

/// One error detail reported by the store for an execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionError {
    pub source: String,
    pub message: String,
}

impl ExecutionError {
    pub fn new(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.message)
    }
}

/// Outcome of one completed execution.
///
/// A request can complete without error and still not be applied, e.g. a
/// conditional insert whose row already exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub applied: bool,
    pub errors: Vec<ExecutionError>,
}

impl ExecutionResult {
    pub fn applied() -> Self {
        Self {
            applied: true,
            errors: Vec::new(),
        }
    }

    pub fn not_applied(errors: Vec<ExecutionError>) -> Self {
        Self {
            applied: false,
            errors,
        }
    }

    /// All reported details, joined.
    pub fn error_message(&self) -> String {
        if self.errors.is_empty() {
            return "write not applied".to_string();
        }
        self.errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Database operations the batch writer needs.
#[async_trait]
pub trait StoreConnection: Send + Sync {
    /// Driver handle of a prepared statement
    type Prepared: Send + Sync + 'static;

    async fn prepare(&self, query: &str, options: &WriteOptions) -> Result<Self::Prepared, StoreError>;

    async fn execute(
        &self,
        statement: &BoundInsert<Self::Prepared>,
    ) -> Result<ExecutionResult, StoreError>;
}
