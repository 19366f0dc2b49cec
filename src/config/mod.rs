//! Configuration management module
//!
//! This module handles loading and validating application configuration
//! from environment variables and .env files, and wiring the AWS pieces
//! (SDK config, credential chain, signer) from it.

pub mod aws;
pub mod settings;

pub use aws::{build_aws_config, create_credential_chain, create_signer, AwsConfigBuilder};
pub use settings::{Environment, Settings};
