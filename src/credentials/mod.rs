//! Credentials module
//!
//! Short-lived AWS credentials obtained through a chain of assume-role hops.
//!
//! # Features
//! - Base credential sources (static keys or the AWS default provider chain)
//! - One caching provider per role hop, refreshed when close to expiry
//! - Single-flight refresh: concurrent callers share one exchange
//! - Chains of any length; a zero-hop chain is the base source itself
//!
//! # Example
//! ```ignore
//! use keyspaces_writer::credentials::{build_chain, ChainOptions, RoleDescriptor};
//!
//! let roles = vec![
//!     RoleDescriptor::new(control_arn, "control", "us-east-1"),
//!     RoleDescriptor::new(linked_arn, "linked", "us-east-1"),
//! ];
//! let provider = build_chain(base, roles, assumer, ChainOptions::default());
//! let credential = provider.credentials().await?;
//! ```

mod assume_role;
mod chain;
mod clock;
mod credential;
mod provider;
mod sts;

pub use assume_role::{AssumeRoleProvider, RoleAssumer, RoleDescriptor};
pub use chain::{build_chain, ChainOptions, DEFAULT_REFRESH_THRESHOLD_SECS};
pub use clock::{Clock, SystemClock};
pub use credential::Credential;
pub use provider::{CredentialProvider, DefaultChainProvider, SharedProvider, StaticProvider};
pub use sts::StsRoleAssumer;
