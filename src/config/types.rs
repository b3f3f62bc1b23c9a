//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/qcinspect/) and project (.qcinspect/) level configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{auth, model, network};
use crate::types::{QcError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// HTTP server settings
    pub server: ServerConfig,

    /// Vision model settings
    pub llm: LlmConfig,

    /// Identity provider settings
    pub auth: AuthConfig,

    /// Persistence settings
    pub database: DatabaseConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            server: ServerConfig::default(),
            llm: LlmConfig::default(),
            auth: AuthConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `QcError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if self.llm.models.is_empty() {
            return Err(QcError::Config(
                "llm.models must list at least one model".to_string(),
            ));
        }

        if self.llm.models.iter().any(|m| m.trim().is_empty()) {
            return Err(QcError::Config(
                "llm.models must not contain empty model names".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(QcError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(QcError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(QcError::Config(
                "server.port must be greater than 0".to_string(),
            ));
        }

        for (key, value) in [
            ("server.base_url", &self.server.base_url),
            ("llm.api_base", &self.llm.api_base),
            ("auth.api_base", &self.auth.api_base),
        ] {
            validate_http_url(key, value)?;
        }

        Ok(())
    }
}

fn validate_http_url(key: &str, value: &str) -> Result<()> {
    let parsed = url::Url::parse(value)
        .map_err(|e| QcError::Config(format!("{} is not a valid URL ({}): {}", key, e, value)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(QcError::Config(format!(
            "{} must use http or https, got '{}'",
            key, scheme
        ))),
    }
}

// =============================================================================
// Server Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,

    /// Bind port
    pub port: u16,

    /// Public base URL used to build image links
    pub base_url: String,

    /// Directory holding uploaded images
    pub upload_dir: PathBuf,

    /// Allowed CORS origins ("*" allows any)
    pub cors_origins: Vec<String>,

    /// Maximum accepted upload size in bytes
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: network::DEFAULT_PORT,
            base_url: format!("http://localhost:{}", network::DEFAULT_PORT),
            upload_dir: PathBuf::from("uploads"),
            cors_origins: vec![
                "http://localhost:5173".to_string(),
                "http://localhost:3000".to_string(),
                "*".to_string(),
            ],
            max_upload_bytes: network::MAX_UPLOAD_BYTES,
        }
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Gemini API base URL
    pub api_base: String,

    /// API key; never serialized to output
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Fallback ladder, tried in declared order
    pub models: Vec<String>,

    /// Temperature for generation
    pub temperature: f32,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("models", &self.models)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: model::DEFAULT_API_BASE.to_string(),
            api_key: None,
            models: model::DEFAULT_LADDER.iter().map(|m| m.to_string()).collect(),
            temperature: model::DEFAULT_TEMPERATURE,
            timeout_secs: network::DEFAULT_TIMEOUT_SECS,
        }
    }
}

// =============================================================================
// Auth Configuration
// =============================================================================

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Identity Toolkit base URL
    pub api_base: String,

    /// Web API key of the identity project; never serialized to output
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_base: auth::DEFAULT_IDENTITY_API_BASE.to_string(),
            api_key: None,
        }
    }
}

// =============================================================================
// Database Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("qcinspect.db"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.llm.models.len(), 6);
        assert_eq!(config.llm.models[0], "gemini-2.0-flash");
        assert_eq!(config.llm.models[5], "gemini-2.5-flash");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_ladder() {
        let mut config = Config::default();
        config.llm.models.clear();
        assert!(matches!(config.validate(), Err(QcError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_temperature() {
        let mut config = Config::default();
        config.llm.temperature = 3.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_urls() {
        let mut config = Config::default();
        config.server.base_url = "localhost:8000".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.llm.api_base = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_redacted_and_not_serialized() {
        let mut config = Config::default();
        config.llm.api_key = Some("super-secret".to_string());

        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("super-secret"));
    }
}
