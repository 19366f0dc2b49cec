//! Role assumption chain

use chrono::Duration;
use std::sync::Arc;

use super::{AssumeRoleProvider, Clock, RoleAssumer, RoleDescriptor, SharedProvider, SystemClock};

/// Default refresh threshold (5 minutes before expiry)
pub const DEFAULT_REFRESH_THRESHOLD_SECS: i64 = 300;

/// Refresh policy shared by every hop of a chain
#[derive(Debug, Clone)]
pub struct ChainOptions {
    pub refresh_threshold: Duration,
    pub clock: Arc<dyn Clock>,
}

impl Default for ChainOptions {
    fn default() -> Self {
        Self {
            refresh_threshold: Duration::seconds(DEFAULT_REFRESH_THRESHOLD_SECS),
            clock: Arc::new(SystemClock),
        }
    }
}

impl ChainOptions {
    pub fn with_refresh_threshold(mut self, threshold: Duration) -> Self {
        self.refresh_threshold = threshold;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// Stack one [`AssumeRoleProvider`] per role on top of `base`, in order.
///
/// Only the terminal provider is returned; intermediate hops are reachable
/// solely through it. With no roles the base provider is returned as is.
pub fn build_chain(
    base: SharedProvider,
    roles: impl IntoIterator<Item = RoleDescriptor>,
    assumer: Arc<dyn RoleAssumer>,
    options: ChainOptions,
) -> SharedProvider {
    roles.into_iter().fold(base, |upstream, role| {
        tracing::debug!(role_arn = %role.role_arn, "Adding assume-role hop");
        Arc::new(AssumeRoleProvider::new(
            upstream,
            role,
            assumer.clone(),
            options.clock.clone(),
            options.refresh_threshold,
        ))
    })
}
