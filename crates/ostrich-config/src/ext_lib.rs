//! External library declarations (`[ext_libs.*]` tables)

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};

/// An external library (or library group) that modules may link against
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ExtLibConfig {
    /// Libraries to link with; defaults to the symbolic name itself
    #[serde(skip_serializing_if = "Option::is_none")]
    pub libs: Option<Vec<String>>,

    /// Additional include search paths
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_paths: Vec<String>,

    /// Additional library search paths
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lib_paths: Vec<String>,

    /// Header-only libraries contribute include paths only
    #[serde(default)]
    pub header_only: bool,
}

impl ExtLibConfig {
    /// Libraries to pass to the linker for the library declared as `name`
    pub fn link_libs(&self, name: &str) -> Vec<String> {
        if self.header_only {
            return Vec::new();
        }
        match &self.libs {
            Some(libs) => libs.clone(),
            None => vec![name.to_string()],
        }
    }

    /// Validate the declaration named `name`
    pub fn validate(&self, name: &str) -> ConfigResult<()> {
        if name.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "ext_libs".to_string(),
                reason: "library name cannot be empty".to_string(),
            });
        }
        if self.header_only && (self.libs.is_some() || !self.lib_paths.is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: format!("ext_libs.{}", name),
                reason: "header-only libraries cannot set libs or lib_paths".to_string(),
            });
        }
        Ok(())
    }
}
