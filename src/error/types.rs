//! Error type definitions

use thiserror::Error;

/// Failures while obtaining or refreshing credentials.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("Credential source error: {0}")]
    Source(String),

    #[error("Assume role failed for {role_arn}: {message}")]
    AssumeRole { role_arn: String, message: String },

    #[error("Identity provider returned no credentials for {0}")]
    MissingCredentials(String),

    #[error("Credentials for {role_arn} expired on arrival (expiry {expires_at})")]
    ExpiredOnArrival { role_arn: String, expires_at: String },
}

/// Failures while computing a connection authentication response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SigningError {
    #[error(transparent)]
    Credentials(#[from] CredentialError),

    #[error("Authentication challenge carried no nonce")]
    MissingNonce,

    #[error("Invalid authentication challenge: {0}")]
    InvalidChallenge(String),
}

/// Schema flattening errors, raised when a statement is built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Entity {0} declares no columns")]
    NoColumns(String),

    #[error("Composite field {field} of {table} has no columns")]
    EmptyComposite { table: String, field: String },

    #[error("Column {column} appears more than once in {table}")]
    DuplicateColumn { table: String, column: String },

    #[error("Invalid identifier {0:?}")]
    InvalidIdentifier(String),
}

/// Per-record binding errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    #[error("No value supplied for column {0}")]
    MissingColumn(String),

    #[error("Value supplied for unknown column {0}")]
    UnknownColumn(String),
}

/// Errors reported by the store connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Failed to connect: {0}")]
    Connect(String),

    #[error("Failed to prepare statement: {0}")]
    Prepare(String),

    #[error("Execution failed: {0}")]
    Execute(String),
}

/// Errors surfaced by batch writes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WriteError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Statement preparation failed: {0}")]
    Prepare(String),

    #[error("{failed} of {total} records failed: {details}")]
    RecordsFailed {
        failed: usize,
        total: usize,
        details: String,
    },
}

/// Crate-level error.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Write(#[from] WriteError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
