//! Ostrich Configuration System
//!
//! Provides the site configuration for Ostrich builds:
//! - Site configuration (site.toml): module order, build base
//! - Toolchain settings shared by all flavors and per-flavor overrides
//! - External library declarations
//!
//! # Configuration Hierarchy
//!
//! Later overrides earlier:
//! 1. Site config (./site.toml, found by walking up)
//! 2. Environment variables (OSTRICH_*)
//! 3. CLI flags
//!
//! # Example
//!
//! ```no_run
//! use ostrich_config::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::new().load_from_directory(Path::new(".")).unwrap();
//! ```

pub mod ext_lib;
pub mod loader;
pub mod site;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use ext_lib::ExtLibConfig;
pub use loader::{Config, ConfigLoader};
pub use site::{SiteConfig, SiteSection, ToolchainSettings, DEFAULT_BUILD_BASE, SITE_FILE};
