//! HMAC-SHA256 request authentication (C1 Authenticator).
//!
//! Stateless over a fixed secret and a configurable allowed clock skew.
//! Signing produces the `IMP_TIMESTAMP` / `IMP_NONCE` / `IMP_SIGN` headers
//! used on both legs of the bridge (outbound native-v1 requests sign with
//! this; inbound remote-originated requests are verified with this).
//!
//! Nonce replay is intentionally not tracked — freshness is enforced by the
//! skew window alone (see the open questions in the project's design
//! ledger). A durable anti-replay mechanism is a documented future
//! extension, not part of this contract.

mod error;

use std::time::{SystemTime, UNIX_EPOCH};

use {
    base64::{Engine as _, engine::general_purpose::STANDARD as BASE64},
    hmac::{Hmac, Mac},
    rand::RngCore,
    sha2::Sha256,
};

pub use error::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// Header name carrying the decimal UTC Unix-seconds timestamp.
pub const HEADER_TIMESTAMP: &str = "IMP_TIMESTAMP";
/// Header name carrying the base64-encoded 16-byte nonce.
pub const HEADER_NONCE: &str = "IMP_NONCE";
/// Header name carrying the base64-encoded HMAC-SHA256 signature.
pub const HEADER_SIGN: &str = "IMP_SIGN";
/// Informational protocol-version header. Accepted but never acted on.
pub const HEADER_API: &str = "IMP_API";

const DEFAULT_ALLOWED_SKEW_SECS: i64 = 30;
const NONCE_LEN: usize = 16;

/// Read-only view over request headers, so this crate doesn't need to
/// depend on any particular HTTP stack's header map type.
pub trait HeaderSource {
    fn get(&self, name: &str) -> Option<&str>;
}

impl<S: AsRef<str> + std::hash::Hash + Eq> HeaderSource for std::collections::HashMap<S, String> {
    fn get(&self, name: &str) -> Option<&str> {
        self.iter()
            .find(|(k, _)| k.as_ref().eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A signed request's three headers, ready to attach to an outbound call.
#[derive(Debug, Clone)]
pub struct SignedHeaders {
    pub timestamp: String,
    pub nonce: String,
    pub signature: String,
}

/// Stateless HMAC-SHA256 signer/verifier over a fixed secret.
pub struct Authenticator {
    secret: Vec<u8>,
    allowed_skew_secs: i64,
}

impl Authenticator {
    #[must_use]
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            allowed_skew_secs: DEFAULT_ALLOWED_SKEW_SECS,
        }
    }

    #[must_use]
    pub fn with_allowed_skew(mut self, secs: i64) -> Self {
        self.allowed_skew_secs = secs;
        self
    }

    /// Authentication is disabled when the secret is empty.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.secret.is_empty()
    }

    /// Signs `body`, producing a fresh timestamp and nonce.
    ///
    /// # Panics
    ///
    /// Never panics in practice: `HmacSha256::new_from_slice` only fails
    /// for invalid key lengths, which HMAC-SHA256 has none of (any byte
    /// length is a valid key).
    #[must_use]
    pub fn sign(&self, body: &[u8]) -> SignedHeaders {
        let timestamp = unix_now().to_string();
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = BASE64.encode(nonce_bytes);
        let signature = self.compute_signature(&timestamp, &nonce, body);
        SignedHeaders {
            timestamp,
            nonce,
            signature,
        }
    }

    /// Verifies a request's headers and body against this authenticator's
    /// secret. Returns `Ok(())` unconditionally when the secret is empty.
    pub fn verify(&self, headers: &impl HeaderSource, body: &[u8]) -> Result<(), AuthError> {
        if !self.is_enabled() {
            return Ok(());
        }

        let timestamp = headers
            .get(HEADER_TIMESTAMP)
            .ok_or(AuthError::MissingHeader(HEADER_TIMESTAMP))?;
        let nonce = headers
            .get(HEADER_NONCE)
            .ok_or(AuthError::MissingHeader(HEADER_NONCE))?;
        let signature = headers
            .get(HEADER_SIGN)
            .ok_or(AuthError::MissingHeader(HEADER_SIGN))?;

        let ts_value: i64 = timestamp.parse().map_err(|_| AuthError::InvalidTimestamp)?;
        let now = unix_now();
        if (now - ts_value).abs() > self.allowed_skew_secs {
            return Err(AuthError::SkewExceeded);
        }

        let expected = self.compute_signature(timestamp, nonce, body);
        if !constant_time_eq(expected.as_bytes(), signature.as_bytes()) {
            return Err(AuthError::SignatureMismatch);
        }

        Ok(())
    }

    fn compute_signature(&self, timestamp: &str, nonce: &str, body: &[u8]) -> String {
        #[allow(clippy::expect_used, reason = "HMAC-SHA256 accepts any key length; this never fails")]
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC-SHA256 accepts any key length");
        mac.update(timestamp.as_bytes());
        mac.update(nonce.as_bytes());
        mac.update(body);
        BASE64.encode(mac.finalize().into_bytes())
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Constant-time byte comparison to avoid leaking signature contents
/// through timing side channels.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
