//! Request signing
//!
//! Authenticated calls carry `api-key`, `timestamp` and `signature` headers.
//! The signature is the lowercase hex HMAC-SHA256 of
//! `METHOD + PATH + TIMESTAMP + BODY` keyed by the API secret, with the
//! timestamp in whole Unix seconds and an empty body for GET requests.

use crate::error::ExchangeError;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

pub const API_KEY_HEADER: &str = "api-key";
pub const SIGNATURE_HEADER: &str = "signature";
pub const TIMESTAMP_HEADER: &str = "timestamp";

/// API key pair. The secret never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn is_complete(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.api_secret.trim().is_empty()
    }

    /// Build the authentication headers for one request.
    pub fn auth_headers(
        &self,
        method: &str,
        path: &str,
        timestamp: i64,
        body: &str,
    ) -> Result<AuthHeaders, ExchangeError> {
        let timestamp = timestamp.to_string();
        let signature = sign(&self.api_secret, method, path, &timestamp, body)?;
        Ok(AuthHeaders {
            api_key: self.api_key.clone(),
            timestamp,
            signature,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHeaders {
    pub api_key: String,
    pub timestamp: String,
    pub signature: String,
}

impl AuthHeaders {
    pub fn pairs(&self) -> [(&'static str, &str); 3] {
        [
            (API_KEY_HEADER, self.api_key.as_str()),
            (TIMESTAMP_HEADER, self.timestamp.as_str()),
            (SIGNATURE_HEADER, self.signature.as_str()),
        ]
    }
}

/// Sign `METHOD + PATH + TIMESTAMP + BODY`.
pub fn sign(
    secret: &str,
    method: &str,
    path: &str,
    timestamp: &str,
    body: &str,
) -> Result<String, ExchangeError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ExchangeError::InvalidConfig(format!("HMAC key: {e}")))?;

    mac.update(method.as_bytes());
    mac.update(path.as_bytes());
    mac.update(timestamp.as_bytes());
    mac.update(body.as_bytes());

    Ok(hex::encode(mac.finalize().into_bytes()))
}
