//! Credential provider trait and base credential sources

use async_trait::async_trait;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_config::SdkConfig;
use std::fmt;
use std::sync::Arc;

use super::Credential;
use crate::error::CredentialError;

/// Anything that can hand out the current credential.
#[async_trait]
pub trait CredentialProvider: Send + Sync + fmt::Debug {
    /// Return a credential that is valid now, refreshing first if needed.
    async fn credentials(&self) -> Result<Credential, CredentialError>;
}

pub type SharedProvider = Arc<dyn CredentialProvider>;

/// Fixed credentials, e.g. access keys from settings
#[derive(Debug, Clone)]
pub struct StaticProvider {
    credential: Credential,
}

impl StaticProvider {
    pub fn new(credential: Credential) -> Self {
        Self { credential }
    }
}

#[async_trait]
impl CredentialProvider for StaticProvider {
    async fn credentials(&self) -> Result<Credential, CredentialError> {
        Ok(self.credential.clone())
    }
}

/// Base credentials resolved by the AWS SDK default chain
/// (environment, profile, web identity, instance metadata).
#[derive(Debug, Clone)]
pub struct DefaultChainProvider {
    inner: SharedCredentialsProvider,
}

impl DefaultChainProvider {
    pub fn new(inner: SharedCredentialsProvider) -> Self {
        Self { inner }
    }

    /// Use the credentials provider configured on an SDK config
    pub fn from_sdk_config(config: &SdkConfig) -> Result<Self, CredentialError> {
        config
            .credentials_provider()
            .map(Self::new)
            .ok_or_else(|| CredentialError::Source("no credentials provider configured".to_string()))
    }
}

#[async_trait]
impl CredentialProvider for DefaultChainProvider {
    async fn credentials(&self) -> Result<Credential, CredentialError> {
        self.inner
            .provide_credentials()
            .await
            .map(Credential::from)
            .map_err(|e| CredentialError::Source(e.to_string()))
    }
}
