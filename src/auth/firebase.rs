//! Firebase Identity Toolkit verifier.
//!
//! Resolves an ID token through `accounts:lookup`; the provider rejects
//! expired or forged tokens, so no local signature check is done.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

use super::{INVALID_TOKEN, IdentityVerifier};
use crate::config::AuthConfig;
use crate::constants::network::{API_KEY_HEADER, DEFAULT_TIMEOUT_SECS};
use crate::types::{QcError, Result};

pub struct FirebaseVerifier {
    /// Web API key; `None` leaves every token unverifiable
    api_key: Option<SecretString>,
    api_base: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for FirebaseVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseVerifier")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl FirebaseVerifier {
    pub fn new(config: &AuthConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::from);

        if api_key.is_none() {
            warn!("FIREBASE_API_KEY not set; authenticated endpoints will reject every token");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| QcError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    async fn verify(&self, token: &str) -> Result<String> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| QcError::Auth("Identity provider is not configured".to_string()))?;

        if token.trim().is_empty() {
            return Err(QcError::Auth(INVALID_TOKEN.to_string()));
        }

        let url = format!("{}/accounts:lookup", self.api_base);
        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, api_key.expose_secret())
            .json(&json!({ "idToken": token }))
            .send()
            .await
            .map_err(|e| {
                QcError::Auth(format!("Identity lookup failed: {}", e.without_url()))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            debug!(%status, body = %body, "Identity lookup rejected token");
            return Err(QcError::Auth(INVALID_TOKEN.to_string()));
        }

        let lookup: LookupResponse = response
            .json()
            .await
            .map_err(|e| {
                QcError::Auth(format!(
                    "Failed to decode identity lookup: {}",
                    e.without_url()
                ))
            })?;

        user_id_from(lookup)
    }

    fn name(&self) -> &str {
        "firebase"
    }
}

fn user_id_from(lookup: LookupResponse) -> Result<String> {
    lookup
        .users
        .into_iter()
        .next()
        .map(|user| user.local_id)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| QcError::Auth(INVALID_TOKEN.to_string()))
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
}
