//! SigV4 signing of authentication challenges

use aws_sigv4::sign::v4::{calculate_signature, generate_signing_key};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::SystemTime;

use crate::credentials::{Clock, Credential, SharedProvider, SystemClock};
use crate::error::SigningError;

/// Signing service name
pub const SERVICE: &str = "cassandra";

/// First client message of the SigV4 handshake
pub const INITIAL_RESPONSE: &[u8] = b"SigV4\0\0";

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Signs connection challenges with the chain's current credential.
///
/// Holds no credential or signature state of its own.
#[derive(Debug, Clone)]
pub struct SigV4Signer {
    provider: SharedProvider,
    region: String,
    clock: Arc<dyn Clock>,
}

impl SigV4Signer {
    pub fn new(provider: SharedProvider, region: impl Into<String>) -> Self {
        Self {
            provider,
            region: region.into(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Answer a server challenge (`nonce=...`) with a fresh signature.
    pub async fn respond_to_challenge(&self, challenge: &[u8]) -> Result<Vec<u8>, SigningError> {
        let nonce = extract_nonce(challenge)?;
        let credential = self.provider.credentials().await?;

        tracing::debug!(
            access_key = %credential.masked_access_key(),
            region = %self.region,
            "Signing connection challenge"
        );

        Ok(signed_response(&credential, &self.region, nonce, self.clock.now()).into_bytes())
    }
}

/// Pull the nonce out of a `key=value,...` challenge.
pub fn extract_nonce(challenge: &[u8]) -> Result<&str, SigningError> {
    let text = std::str::from_utf8(challenge)
        .map_err(|e| SigningError::InvalidChallenge(e.to_string()))?;

    text.split(',')
        .find_map(|part| part.trim().strip_prefix("nonce="))
        .filter(|nonce| !nonce.is_empty())
        .ok_or(SigningError::MissingNonce)
}

/// Build the `signature=...,access_key=...,amzdate=...` response.
pub fn signed_response(credential: &Credential, region: &str, nonce: &str, now: DateTime<Utc>) -> String {
    let amz_date = now.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
    let date_stamp = now.format("%Y%m%d").to_string();
    let scope = format!("{}/{}/{}/aws4_request", date_stamp, region, SERVICE);

    let canonical = canonical_request(credential.access_key_id(), &scope, &amz_date, nonce);
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        scope,
        sha256_hex(canonical.as_bytes())
    );

    let signing_key = generate_signing_key(
        credential.secret_access_key(),
        SystemTime::from(now),
        region,
        SERVICE,
    );
    let signature = calculate_signature(signing_key, string_to_sign.as_bytes());

    let mut response = format!(
        "signature={},access_key={},amzdate={}",
        signature,
        credential.access_key_id(),
        amz_date
    );
    if let Some(token) = credential.session_token() {
        response.push_str(",session_token=");
        response.push_str(token);
    }
    response
}

fn canonical_request(access_key_id: &str, scope: &str, amz_date: &str, nonce: &str) -> String {
    let query = format!(
        "X-Amz-Algorithm={}&X-Amz-Credential={}&X-Amz-Date={}&X-Amz-Expires=900",
        ALGORITHM,
        uri_encode(&format!("{}/{}", access_key_id, scope)),
        uri_encode(amz_date)
    );

    format!(
        "PUT\n/authenticate\n{}\nhost:{}\n\nhost\n{}",
        query,
        SERVICE,
        sha256_hex(nonce.as_bytes())
    )
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// RFC 3986 encoding, everything but unreserved characters escaped
fn uri_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}
