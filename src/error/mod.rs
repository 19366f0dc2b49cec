//! Error types
//!
//! One error enum per concern, plus a crate-level [`Error`] that any of them
//! converts into.

mod types;

pub use types::{
    BindError, CredentialError, Error, Result, SchemaError, SigningError, StoreError, WriteError,
};
