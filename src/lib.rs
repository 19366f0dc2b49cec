//! Keyspaces batch writer library
//!
//! Writes batches of typed records to a Cassandra-compatible store,
//! authenticating every connection with SigV4 signatures computed from
//! credentials obtained through a chain of assumed roles.

// Public modules
pub mod batch;
pub mod config;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod schema;
pub mod signer;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use batch::{BatchReport, BatchWriter};
pub use config::Settings;
pub use error::{Error, WriteError};
pub use schema::{Entity, EntitySchema, WriteOptions};
pub use signer::SigV4Signer;
