//! Driver authenticator backed by [`SigV4Signer`]

use async_trait::async_trait;
use scylla::authentication::{AuthError, AuthenticatorProvider, AuthenticatorSession};

use super::{SigV4Signer, INITIAL_RESPONSE};
use crate::error::SigningError;

/// Starts one signing session per connection handshake.
#[derive(Debug, Clone)]
pub struct SigV4AuthenticatorProvider {
    signer: SigV4Signer,
}

impl SigV4AuthenticatorProvider {
    pub fn new(signer: SigV4Signer) -> Self {
        Self { signer }
    }
}

#[async_trait]
impl AuthenticatorProvider for SigV4AuthenticatorProvider {
    async fn start_authentication_session(
        &self,
        authenticator_name: &str,
    ) -> Result<(Option<Vec<u8>>, Box<dyn AuthenticatorSession>), AuthError> {
        tracing::debug!(authenticator = %authenticator_name, "Starting SigV4 authentication");

        let session: Box<dyn AuthenticatorSession> = Box::new(SigV4Session {
            signer: self.signer.clone(),
        });
        Ok((Some(INITIAL_RESPONSE.to_vec()), session))
    }
}

struct SigV4Session {
    signer: SigV4Signer,
}

#[async_trait]
impl AuthenticatorSession for SigV4Session {
    async fn evaluate_challenge(&mut self, token: Option<&[u8]>) -> Result<Option<Vec<u8>>, AuthError> {
        let challenge = token.ok_or_else(|| SigningError::MissingNonce.to_string())?;

        self.signer
            .respond_to_challenge(challenge)
            .await
            .map(Some)
            .map_err(|e| {
                tracing::warn!(error = %e, "SigV4 authentication failed");
                e.to_string()
            })
    }

    async fn success(&mut self, _token: Option<&[u8]>) -> Result<(), AuthError> {
        Ok(())
    }
}
