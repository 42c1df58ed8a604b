//! Configuration Loader
//!
//! Finds the site configuration and applies environment overrides.

use crate::site::{SiteConfig, SITE_FILE};
use crate::{ConfigError, ConfigResult};
use std::env;
use std::path::{Path, PathBuf};

/// Configuration loader
///
/// Sources, later overriding earlier:
/// 1. Site config (site.toml at the project root)
/// 2. Environment variables (OSTRICH_*)
/// 3. CLI flags (handled by caller)
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Skip `OSTRICH_*` environment overrides
    ignore_env: bool,
}

/// Loaded configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Site configuration
    pub site: SiteConfig,

    /// Project root directory (where site.toml was found)
    pub project_root: PathBuf,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { ignore_env: false }
    }

    /// Do not apply `OSTRICH_*` environment overrides
    pub fn ignore_env(mut self, ignore: bool) -> Self {
        self.ignore_env = ignore;
        self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find site.toml.
    pub fn load_from_directory(&self, start_dir: &Path) -> ConfigResult<Config> {
        let start_dir = if start_dir.is_absolute() {
            start_dir.to_path_buf()
        } else {
            env::current_dir()?.join(start_dir)
        };
        let config_path = Self::find_site_config(&start_dir)
            .ok_or_else(|| ConfigError::NotFound(start_dir.join(SITE_FILE)))?;
        self.load_from_file(&config_path)
    }

    /// Load configuration from a specific site.toml
    pub fn load_from_file(&self, config_path: &Path) -> ConfigResult<Config> {
        let site = SiteConfig::load_from_file(config_path)?;
        let site = self.apply_env_overrides(site)?;
        // overrides may move build roots onto each other
        site.validate()?;

        let project_root = match config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        Ok(Config { site, project_root })
    }

    /// Find site.toml by walking up from `start_dir`
    pub fn find_site_config(start_dir: &Path) -> Option<PathBuf> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(SITE_FILE);
            if config_path.is_file() {
                return Some(config_path);
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return None,
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Recognized: OSTRICH_BUILD_BASE, OSTRICH_CC, OSTRICH_CXX
    fn apply_env_overrides(&self, mut config: SiteConfig) -> ConfigResult<SiteConfig> {
        if self.ignore_env {
            return Ok(config);
        }

        if let Ok(build_base) = env::var("OSTRICH_BUILD_BASE") {
            if build_base.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "OSTRICH_BUILD_BASE".to_string(),
                    reason: "build base cannot be empty".to_string(),
                });
            }
            config.site.build_base = PathBuf::from(build_base);
        }

        if let Ok(cc) = env::var("OSTRICH_CC") {
            config.common.cc = Some(cc);
        }

        if let Ok(cxx) = env::var("OSTRICH_CXX") {
            config.common.cxx = Some(cxx);
        }

        Ok(config)
    }
}

impl Config {
    /// Get the project root directory
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Build base directory, resolved against the project root
    pub fn build_base(&self) -> PathBuf {
        self.project_root.join(&self.site.site.build_base)
    }
}
