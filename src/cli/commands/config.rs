//! Config Command
//!
//! Usage:
//!   qcinspect config show [-f toml|json]
//!   qcinspect config path
//!   qcinspect config init [-g] [--force]

use crate::cli::Output;
use crate::config::ConfigLoader;
use crate::types::{QcError, Result};

/// Print the merged effective configuration
pub fn show(format: &str) -> Result<()> {
    match format {
        "json" => ConfigLoader::show_config(true),
        "toml" | "text" => ConfigLoader::show_config(false),
        other => Err(QcError::Validation(format!(
            "Unknown format '{}'. Valid values: toml, json",
            other
        ))),
    }
}

pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

/// Write a default config file, globally or for the current directory
pub fn init(global: bool, force: bool) -> Result<()> {
    let output = Output::new();

    let (dir, config_path) = if global {
        let dir = ConfigLoader::init_global(force)?;
        (dir.clone(), dir.join("config.toml"))
    } else {
        let dir = ConfigLoader::init_project(force)?;
        (dir, ConfigLoader::project_config_path())
    };

    let scope = if global { "global" } else { "project" };
    output.success(&format!("Initialized {} configuration", scope));
    output.field("Directory", &dir.display().to_string());
    output.field("Config", &config_path.display().to_string());
    Ok(())
}
