//! Bearer Token Authentication
//!
//! Owner endpoints require `Authorization: Bearer <token>`. The token is an
//! identity-provider ID token; verification is delegated to an
//! [`IdentityVerifier`] which resolves it to a user id.

mod firebase;

pub use firebase::FirebaseVerifier;

use async_trait::async_trait;
use std::sync::Arc;

use crate::types::{QcError, Result};

pub const MISSING_HEADER: &str = "Missing Authorization Header";
pub const INVALID_HEADER_FORMAT: &str = "Invalid Authorization Header Format";
pub const INVALID_TOKEN: &str = "Invalid or Expired Token";

/// Extract the token from an `Authorization` header value
pub fn bearer_token(header: Option<&str>) -> Result<&str> {
    let header = header
        .filter(|h| !h.is_empty())
        .ok_or_else(|| QcError::Auth(MISSING_HEADER.to_string()))?;

    header
        .strip_prefix("Bearer ")
        .ok_or_else(|| QcError::Auth(INVALID_HEADER_FORMAT.to_string()))
}

/// Same as [`bearer_token`] for a raw header; non-UTF-8 bytes are a format error
pub fn bearer_token_bytes(header: Option<&[u8]>) -> Result<&str> {
    let header = header
        .map(|bytes| {
            std::str::from_utf8(bytes)
                .map_err(|_| QcError::Auth(INVALID_HEADER_FORMAT.to_string()))
        })
        .transpose()?;
    bearer_token(header)
}

/// Shared verifier type for request handlers
pub type SharedVerifier = Arc<dyn IdentityVerifier + Send + Sync>;

/// Resolves ID tokens to user ids
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verify `token` and return the user id it belongs to
    async fn verify(&self, token: &str) -> Result<String>;

    /// Verifier name for logging
    fn name(&self) -> &str;
}

/// Fixed token table for router tests
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct StaticVerifier {
    tokens: std::collections::HashMap<String, String>,
}

#[cfg(test)]
impl StaticVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, user_id: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), user_id.into());
        self
    }
}

#[cfg(test)]
#[async_trait]
impl IdentityVerifier for StaticVerifier {
    async fn verify(&self, token: &str) -> Result<String> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| QcError::Auth(INVALID_TOKEN.to_string()))
    }

    fn name(&self) -> &str {
        "static"
    }
}
