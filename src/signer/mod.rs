//! Connection request signing
//!
//! Amazon Keyspaces replaces password authentication with a SigV4 signature
//! over a server-issued nonce. [`SigV4Signer`] pulls the current credential
//! from the terminal provider of the role chain on every signature;
//! [`SigV4AuthenticatorProvider`] plugs it into the driver's connection
//! handshake.

mod authenticator;
mod sigv4;

pub use authenticator::SigV4AuthenticatorProvider;
pub use sigv4::{extract_nonce, signed_response, SigV4Signer, INITIAL_RESPONSE, SERVICE};
