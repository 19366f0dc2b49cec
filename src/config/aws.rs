//! AWS SDK configuration
//!
//! This module builds the base SDK configuration and, from it, the
//! assume-role credential chain and request signer used for store
//! connections.

use aws_config::{meta::region::RegionProviderChain, BehaviorVersion, Region, SdkConfig};
use chrono::Duration;
use std::sync::Arc;

use crate::config::Settings;
use crate::credentials::{
    build_chain, ChainOptions, Credential, DefaultChainProvider, RoleDescriptor, SharedProvider,
    StaticProvider, StsRoleAssumer,
};
use crate::error::CredentialError;
use crate::signer::SigV4Signer;

/// AWS configuration builder
///
/// Creates AWS SDK configuration and credential chains with support for:
/// - Custom regions
/// - Static access keys or the default credential chain as the base
/// - Control and linked role hops
pub struct AwsConfigBuilder<'a> {
    settings: &'a Settings,
}

impl<'a> AwsConfigBuilder<'a> {
    /// Create a new AWS configuration builder
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Build the base AWS SDK configuration
    ///
    /// Used for the STS client and, when no static keys are configured,
    /// as the base credential source.
    pub async fn build_sdk_config(&self) -> SdkConfig {
        let region_provider = RegionProviderChain::first_try(Region::new(self.settings.aws_region.clone()))
            .or_default_provider();

        aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await
    }

    /// Base credential source: static keys from settings, else the SDK chain
    pub fn build_base_provider(&self, sdk_config: &SdkConfig) -> Result<SharedProvider, CredentialError> {
        if let (Some(key_id), Some(secret)) = (
            &self.settings.aws_access_key_id,
            &self.settings.aws_secret_access_key,
        ) {
            tracing::debug!("Using static base credentials from settings");
            let credential = Credential::new(
                key_id.clone(),
                secret.clone(),
                self.settings.aws_session_token.clone(),
                None,
            );
            return Ok(Arc::new(StaticProvider::new(credential)));
        }

        tracing::debug!("Using AWS default credential chain as base");
        Ok(Arc::new(DefaultChainProvider::from_sdk_config(sdk_config)?))
    }

    /// Role hops in chain order: control first, then linked
    pub fn role_descriptors(&self) -> Vec<RoleDescriptor> {
        let settings = self.settings;
        [
            (&settings.control_role_arn, &settings.control_role_session_name),
            (&settings.linked_role_arn, &settings.linked_role_session_name),
        ]
        .into_iter()
        .filter_map(|(arn, session_name)| {
            let arn = arn.as_ref()?;
            let role = RoleDescriptor::new(arn.clone(), session_name.clone(), settings.aws_region.clone())
                .with_duration_seconds(settings.role_session_duration_seconds);
            Some(match &settings.role_external_id {
                Some(external_id) => role.with_external_id(external_id.clone()),
                None => role,
            })
        })
        .collect()
    }

    /// Terminal provider of the configured credential chain
    pub async fn build_credential_chain(&self) -> Result<SharedProvider, CredentialError> {
        let sdk_config = self.build_sdk_config().await;
        let base = self.build_base_provider(&sdk_config)?;
        let roles = self.role_descriptors();

        tracing::info!(hops = roles.len(), region = %self.settings.aws_region, "Building credential chain");

        let options = ChainOptions::default()
            .with_refresh_threshold(Duration::seconds(self.settings.credential_refresh_threshold_seconds));

        Ok(build_chain(base, roles, Arc::new(StsRoleAssumer::new(sdk_config)), options))
    }

    /// Signer over the configured credential chain
    pub async fn build_signer(&self) -> Result<SigV4Signer, CredentialError> {
        let chain = self.build_credential_chain().await?;
        Ok(SigV4Signer::new(chain, self.settings.aws_region.clone()))
    }
}

/// Build AWS SDK config from settings (convenience function)
pub async fn build_aws_config(settings: &Settings) -> SdkConfig {
    AwsConfigBuilder::new(settings).build_sdk_config().await
}

/// Create the credential chain from settings (convenience function)
pub async fn create_credential_chain(settings: &Settings) -> Result<SharedProvider, CredentialError> {
    AwsConfigBuilder::new(settings).build_credential_chain().await
}

/// Create a signer from settings (convenience function)
pub async fn create_signer(settings: &Settings) -> Result<SigV4Signer, CredentialError> {
    AwsConfigBuilder::new(settings).build_signer().await
}
