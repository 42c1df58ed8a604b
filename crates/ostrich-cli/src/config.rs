//! CLI configuration via environment variables
//!
//! Output preferences only; build settings live in site.toml and are
//! overridden through `OSTRICH_*` variables by the config loader.

use std::env;

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Default to JSON output (OSTRICH_OUTPUT=json)
    pub default_json: bool,
    /// Disable colored output (OSTRICH_NO_COLOR=1 or NO_COLOR=1)
    pub no_color: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            default_json: env::var("OSTRICH_OUTPUT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            no_color: env::var("OSTRICH_NO_COLOR").is_ok() || env::var("NO_COLOR").is_ok(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
