pub mod build;
pub mod flavors;
pub mod modules;
pub mod query;

use anyhow::{Context, Result};
use ostrich_config::{Config, ConfigLoader};
use std::path::PathBuf;

/// Project directory from `-C`, defaulting to the current directory
pub fn project_dir(directory: Option<PathBuf>) -> PathBuf {
    directory.unwrap_or_else(|| PathBuf::from("."))
}

/// Load site.toml for the project containing `directory`
pub fn load_config(directory: Option<PathBuf>) -> Result<Config> {
    let dir = project_dir(directory);
    ConfigLoader::new()
        .load_from_directory(&dir)
        .with_context(|| format!("Failed to load site configuration from {}", dir.display()))
}
