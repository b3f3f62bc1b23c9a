//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/qcinspect/config.toml)
//! 3. Project config (.qcinspect/config.toml)
//! 4. Environment variables (QCINSPECT_* prefix, `__` separates sections)
//! 5. Well-known deployment variables (GOOGLE_API_KEY, DATABASE_URL, ...)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::types::{QcError, Result};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain using Figment:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        let project_path = Self::project_config_path();
        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(&project_path));
        }

        // e.g. QCINSPECT_SERVER__PORT -> server.port
        figment = figment.merge(Env::prefixed("QCINSPECT_").split("__").lowercase(true));

        let mut config: Config = figment
            .extract()
            .map_err(|e| QcError::Config(format!("Configuration error: {}", e)))?;

        Self::apply_well_known_env(&mut config, |key| env::var(key).ok());

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| QcError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Apply deployment variables that predate the prefixed scheme.
    ///
    /// These win over file configuration so hosted deployments can be
    /// configured purely from the environment.
    pub fn apply_well_known_env<F>(config: &mut Config, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("GOOGLE_API_KEY") {
            config.llm.api_key = Some(key);
        }

        if let Some(key) = non_empty("FIREBASE_API_KEY") {
            config.auth.api_key = Some(key);
        }

        if let Some(base_url) = non_empty("BASE_URL") {
            config.server.base_url = base_url;
        }

        if let Some(url) = non_empty("DATABASE_URL") {
            let path = url
                .strip_prefix("sqlite://")
                .or_else(|| url.strip_prefix("sqlite:"))
                .unwrap_or(&url);
            config.database.path = PathBuf::from(path);
        }
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/qcinspect/)
    pub fn global_dir() -> Option<PathBuf> {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join(".config"))
            })
            .map(|p| p.join("qcinspect"))
    }

    /// Get path to global config file
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get path to project config file
    pub fn project_config_path() -> PathBuf {
        PathBuf::from(".qcinspect/config.toml")
    }

    /// Get project data directory
    pub fn project_dir() -> PathBuf {
        PathBuf::from(".qcinspect")
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Show config file paths
    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
    }

    /// Show current effective configuration
    pub fn show_config(as_json: bool) -> Result<()> {
        let config = Self::load()?;

        if as_json {
            println!("{}", serde_json::to_string_pretty(&config)?);
        } else {
            println!(
                "{}",
                toml::to_string_pretty(&config).map_err(|e| QcError::Config(e.to_string()))?
            );
        }

        Ok(())
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Initialize global configuration
    pub fn init_global(force: bool) -> Result<PathBuf> {
        let global_dir = Self::global_dir().ok_or_else(|| {
            QcError::Config("Cannot determine global config directory".to_string())
        })?;

        fs::create_dir_all(&global_dir)?;

        let config_path = global_dir.join("config.toml");
        Self::write_default(&config_path, force)?;

        Ok(global_dir)
    }

    /// Initialize project configuration
    pub fn init_project(force: bool) -> Result<PathBuf> {
        let project_dir = Self::project_dir();
        fs::create_dir_all(&project_dir)?;

        let config_path = project_dir.join("config.toml");
        Self::write_default(&config_path, force)?;

        Ok(project_dir)
    }

    // =========================================================================
    // Internal
    // =========================================================================

    fn write_default(config_path: &Path, force: bool) -> Result<()> {
        if !config_path.exists() || force {
            fs::write(config_path, Self::default_config_toml())?;
            info!("Created config: {}", config_path.display());
        } else {
            info!("Config exists: {}", config_path.display());
        }
        Ok(())
    }

    /// Generate default config content (TOML)
    fn default_config_toml() -> String {
        r#"# qcinspect Configuration
# Project settings in .qcinspect/config.toml override the global file.
# Secrets are read from GOOGLE_API_KEY and FIREBASE_API_KEY.

version = "1.0"

[server]
host = "0.0.0.0"
port = 8000
base_url = "http://localhost:8000"
upload_dir = "uploads"

# Fallback ladder, tried in order until one model returns content
[llm]
models = [
    "gemini-2.0-flash",
    "gemini-2.0-flash-lite",
    "gemini-1.5-flash",
    "gemini-1.5-flash-8b",
    "gemini-1.5-pro",
    "gemini-2.5-flash",
]
temperature = 0.2
timeout_secs = 120

[database]
path = "qcinspect.db"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_load_from_file_overrides_ladder() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[llm]\nmodels = [\"gemini-1.5-pro\"]\n[server]\nport = 9100\n",
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.llm.models, vec!["gemini-1.5-pro".to_string()]);
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.upload_dir, PathBuf::from("uploads"));
    }

    #[test]
    fn test_load_from_file_validates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[llm]\nmodels = []\n").unwrap();

        assert!(ConfigLoader::load_from_file(&path).is_err());
    }

    #[test]
    fn test_default_toml_parses() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, ConfigLoader::default_config_toml()).unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.llm.models, Config::default().llm.models);
    }

    #[test]
    fn test_well_known_env() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("GOOGLE_API_KEY", "g-key"),
            ("DATABASE_URL", "sqlite:///var/lib/qc.db"),
            ("BASE_URL", "https://qc.example.com"),
            ("FIREBASE_API_KEY", ""),
        ]);
        let mut config = Config::default();

        ConfigLoader::apply_well_known_env(&mut config, |k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.llm.api_key.as_deref(), Some("g-key"));
        assert_eq!(config.database.path, PathBuf::from("/var/lib/qc.db"));
        assert_eq!(config.server.base_url, "https://qc.example.com");
        assert!(config.auth.api_key.is_none());
    }
}
