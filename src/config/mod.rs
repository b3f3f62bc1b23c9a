//! Configuration Management
//!
//! Unified configuration system with hierarchical resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/qcinspect/config.toml)
//! 3. Project config (.qcinspect/config.toml)
//! 4. Environment variables (QCINSPECT_*, then GOOGLE_API_KEY and friends)
//! 5. CLI arguments (highest priority)

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::*;
