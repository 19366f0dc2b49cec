//! Assume-role hop
//!
//! Each hop caches the credential it obtained and only calls the identity
//! provider again when that credential is close to expiry. The upstream
//! provider (the base source, or the previous hop) is consulted on every
//! refresh, so a refresh here may cascade into a refresh upstream.

use async_trait::async_trait;
use chrono::Duration;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use super::{Clock, Credential, CredentialProvider, SharedProvider};
use crate::error::CredentialError;

/// What identity a hop assumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDescriptor {
    pub role_arn: String,
    pub session_name: String,
    pub region: String,
    pub external_id: Option<String>,
    /// Requested session duration
    pub duration_seconds: Option<i32>,
}

impl RoleDescriptor {
    pub fn new(
        role_arn: impl Into<String>,
        session_name: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            role_arn: role_arn.into(),
            session_name: session_name.into(),
            region: region.into(),
            external_id: None,
            duration_seconds: None,
        }
    }

    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    pub fn with_duration_seconds(mut self, seconds: i32) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }
}

/// Identity provider exchange: base credentials + role -> role credentials.
#[async_trait]
pub trait RoleAssumer: Send + Sync + fmt::Debug {
    async fn assume_role(
        &self,
        base: &Credential,
        role: &RoleDescriptor,
    ) -> Result<Credential, CredentialError>;
}

type RefreshFuture = Shared<BoxFuture<'static, Result<Credential, CredentialError>>>;

/// Caching provider for one hop of the chain.
///
/// At most one refresh runs at a time. Callers arriving while it is in
/// flight await the same future and receive the same result, success or
/// failure. The next access after it settles may start another.
pub struct AssumeRoleProvider {
    hop: Arc<Hop>,
    in_flight: Mutex<Option<RefreshFuture>>,
}

impl fmt::Debug for AssumeRoleProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssumeRoleProvider")
            .field("hop", &self.hop)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct Hop {
    upstream: SharedProvider,
    role: RoleDescriptor,
    assumer: Arc<dyn RoleAssumer>,
    clock: Arc<dyn Clock>,
    refresh_threshold: Duration,
    cached: RwLock<Option<Credential>>,
}

impl AssumeRoleProvider {
    pub fn new(
        upstream: SharedProvider,
        role: RoleDescriptor,
        assumer: Arc<dyn RoleAssumer>,
        clock: Arc<dyn Clock>,
        refresh_threshold: Duration,
    ) -> Self {
        Self {
            hop: Arc::new(Hop {
                upstream,
                role,
                assumer,
                clock,
                refresh_threshold,
                cached: RwLock::new(None),
            }),
            in_flight: Mutex::new(None),
        }
    }

    /// Join the refresh in flight, or start one.
    async fn join_refresh(&self) -> RefreshFuture {
        let mut in_flight = self.in_flight.lock().await;
        if let Some(refresh) = in_flight.as_ref() {
            return refresh.clone();
        }

        let hop = self.hop.clone();
        let refresh = async move { hop.refresh().await }.boxed().shared();
        *in_flight = Some(refresh.clone());
        refresh
    }

    async fn settle(&self, refresh: &RefreshFuture) {
        let mut in_flight = self.in_flight.lock().await;
        if in_flight.as_ref().is_some_and(|current| current.ptr_eq(refresh)) {
            *in_flight = None;
        }
    }
}

impl Hop {
    async fn fresh_cached(&self) -> Option<Credential> {
        let cached = self.cached.read().await;
        cached
            .as_ref()
            .filter(|cred| !cred.needs_refresh(self.clock.now(), self.refresh_threshold))
            .cloned()
    }

    async fn refresh(&self) -> Result<Credential, CredentialError> {
        // A refresh that settled just before this one started already did the work
        if let Some(credential) = self.fresh_cached().await {
            return Ok(credential);
        }

        let result = self.assume().await;
        if let Err(e) = &result {
            tracing::warn!(role_arn = %self.role.role_arn, error = %e, "Credential refresh failed");
        }
        result
    }

    async fn assume(&self) -> Result<Credential, CredentialError> {
        let base = self.upstream.credentials().await?;

        tracing::debug!(
            role_arn = %self.role.role_arn,
            session_name = %self.role.session_name,
            base_access_key = %base.masked_access_key(),
            "Assuming role"
        );

        let credential = self.assumer.assume_role(&base, &self.role).await?;

        if credential.is_expired(self.clock.now()) {
            return Err(CredentialError::ExpiredOnArrival {
                role_arn: self.role.role_arn.clone(),
                expires_at: credential
                    .expires_at()
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_default(),
            });
        }

        tracing::info!(
            role_arn = %self.role.role_arn,
            access_key = %credential.masked_access_key(),
            expires_at = ?credential.expires_at(),
            "Assumed role"
        );

        *self.cached.write().await = Some(credential.clone());
        Ok(credential)
    }
}

#[async_trait]
impl CredentialProvider for AssumeRoleProvider {
    async fn credentials(&self) -> Result<Credential, CredentialError> {
        if let Some(credential) = self.hop.fresh_cached().await {
            return Ok(credential);
        }

        let refresh = self.join_refresh().await;
        let result = refresh.clone().await;
        self.settle(&refresh).await;
        result
    }
}
