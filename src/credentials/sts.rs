//! STS-backed identity provider

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sts::config::Region;
use aws_sdk_sts::error::DisplayErrorContext;
use chrono::DateTime;

use super::{Credential, RoleAssumer, RoleDescriptor};
use crate::error::CredentialError;

/// Calls `sts:AssumeRole` signed with whatever base credential the hop
/// passes in.
///
/// A client is built per exchange because the signing credential differs
/// per hop and per refresh. Exchanges only happen on cache misses.
#[derive(Debug, Clone)]
pub struct StsRoleAssumer {
    sdk_config: SdkConfig,
}

impl StsRoleAssumer {
    pub fn new(sdk_config: SdkConfig) -> Self {
        Self { sdk_config }
    }

    fn client_for(&self, base: &Credential, role: &RoleDescriptor) -> aws_sdk_sts::Client {
        let config = aws_sdk_sts::config::Builder::from(&self.sdk_config)
            .region(Region::new(role.region.clone()))
            .credentials_provider(aws_credential_types::Credentials::from(base))
            .build();

        aws_sdk_sts::Client::from_conf(config)
    }
}

#[async_trait]
impl RoleAssumer for StsRoleAssumer {
    async fn assume_role(
        &self,
        base: &Credential,
        role: &RoleDescriptor,
    ) -> Result<Credential, CredentialError> {
        let output = self
            .client_for(base, role)
            .assume_role()
            .role_arn(&role.role_arn)
            .role_session_name(&role.session_name)
            .set_external_id(role.external_id.clone())
            .set_duration_seconds(role.duration_seconds)
            .send()
            .await
            .map_err(|e| CredentialError::AssumeRole {
                role_arn: role.role_arn.clone(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        let credentials = output
            .credentials()
            .ok_or_else(|| CredentialError::MissingCredentials(role.role_arn.clone()))?;

        let expiration = credentials.expiration();
        let expires_at = DateTime::from_timestamp(expiration.secs(), expiration.subsec_nanos())
            .ok_or_else(|| CredentialError::AssumeRole {
                role_arn: role.role_arn.clone(),
                message: format!("expiration out of range: {:?}", expiration),
            })?;

        Ok(Credential::new(
            credentials.access_key_id(),
            credentials.secret_access_key(),
            Some(credentials.session_token().to_string()),
            Some(expires_at),
        ))
    }
}
