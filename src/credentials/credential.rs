//! Credential value type

use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::time::SystemTime;

/// An issued set of AWS credentials.
///
/// Never mutated after issue; a refresh produces a new value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
    /// `None` for long-lived keys
    expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
            expires_at,
        }
    }

    /// Long-lived access key pair without session token or expiry
    pub fn permanent(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self::new(access_key_id, secret_access_key, None, None)
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// True once `now` is within `threshold` of expiry.
    pub fn needs_refresh(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at - threshold <= now,
            None => false,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expires_at) if expires_at <= now)
    }

    /// Access key prefix safe for logs
    pub fn masked_access_key(&self) -> &str {
        let end = self
            .access_key_id
            .char_indices()
            .nth(8)
            .map(|(i, _)| i)
            .unwrap_or(self.access_key_id.len());
        &self.access_key_id[..end]
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &self.masked_access_key())
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &self.session_token.as_ref().map(|_| "** redacted **"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl From<aws_credential_types::Credentials> for Credential {
    fn from(credentials: aws_credential_types::Credentials) -> Self {
        Self::new(
            credentials.access_key_id(),
            credentials.secret_access_key(),
            credentials.session_token().map(str::to_string),
            credentials.expiry().map(DateTime::<Utc>::from),
        )
    }
}

impl From<&Credential> for aws_credential_types::Credentials {
    fn from(credential: &Credential) -> Self {
        aws_credential_types::Credentials::new(
            credential.access_key_id.clone(),
            credential.secret_access_key.clone(),
            credential.session_token.clone(),
            credential.expires_at.map(SystemTime::from),
            "keyspaces-writer-chain",
        )
    }
}
