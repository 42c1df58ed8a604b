//! Site configuration (site.toml)
//!
//! Describes everything the site build needs before any module is read:
//! the ordered module list, the toolchain and flags shared by all flavors,
//! the per-flavor overrides and the external libraries modules may link.

use crate::ext_lib::ExtLibConfig;
use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// File name of the site configuration at the project root
pub const SITE_FILE: &str = "site.toml";

/// Default directory for build outputs, relative to the project root
pub const DEFAULT_BUILD_BASE: &str = "build";

/// Site configuration from site.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Site-wide settings
    #[serde(default)]
    pub site: SiteSection,

    /// Settings shared by every flavor
    #[serde(default)]
    pub common: ToolchainSettings,

    /// Flavor-specific settings, keyed by flavor name
    #[serde(default)]
    pub flavors: BTreeMap<String, ToolchainSettings>,

    /// External libraries, keyed by symbolic name
    #[serde(default)]
    pub ext_libs: BTreeMap<String, ExtLibConfig>,
}

/// The `[site]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SiteSection {
    /// Base directory for flavor build roots
    #[serde(default = "default_build_base")]
    pub build_base: PathBuf,

    /// Modules to build, in dependency order.
    ///
    /// A module may only depend on modules listed before it.
    #[serde(default)]
    pub modules: Vec<String>,

    /// Build independent flavors in parallel
    #[serde(default = "default_true")]
    pub parallel: bool,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            build_base: default_build_base(),
            modules: Vec::new(),
            parallel: true,
        }
    }
}

fn default_build_base() -> PathBuf {
    PathBuf::from(DEFAULT_BUILD_BASE)
}

fn default_true() -> bool {
    true
}

/// Toolchain settings, used both for `[common]` and for each `[flavors.*]` table.
///
/// Scalars set in a flavor replace the common value; lists extend it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ToolchainSettings {
    /// C compiler
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cc: Option<String>,

    /// C++ compiler
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cxx: Option<String>,

    /// Static archiver
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ar: Option<String>,

    /// Build root override (default: `<build_base>/<flavor>`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_root: Option<PathBuf>,

    /// Compiler flags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<String>,

    /// Preprocessor defines (without the `-D`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defines: Vec<String>,

    /// Include search paths (`#` prefix = project root, `$BUILDROOT` = flavor build root)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_paths: Vec<String>,

    /// Linker flags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub link_flags: Vec<String>,
}

impl ToolchainSettings {
    /// Layer `other` on top of these settings.
    ///
    /// Scalar settings present in `other` replace ours, list settings are appended.
    pub fn layer(&mut self, other: &ToolchainSettings) {
        if let Some(cc) = &other.cc {
            self.cc = Some(cc.clone());
        }
        if let Some(cxx) = &other.cxx {
            self.cxx = Some(cxx.clone());
        }
        if let Some(ar) = &other.ar {
            self.ar = Some(ar.clone());
        }
        if let Some(build_root) = &other.build_root {
            self.build_root = Some(build_root.clone());
        }
        self.flags.extend(other.flags.iter().cloned());
        self.defines.extend(other.defines.iter().cloned());
        self.include_paths.extend(other.include_paths.iter().cloned());
        self.link_flags.extend(other.link_flags.iter().cloned());
    }
}

impl SiteConfig {
    /// Load site configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        Self::parse(&content, path)
    }

    /// Parse and validate site configuration text; `path` is used for diagnostics
    pub fn parse(content: &str, path: &Path) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the site configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.flavor_names().is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one flavor must be defined under [flavors]".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for module in &self.site.modules {
            if module.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "site.modules".to_string(),
                    reason: "module path cannot be empty".to_string(),
                });
            }
            if !seen.insert(module.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: "site.modules".to_string(),
                    reason: format!("module '{}' is listed more than once", module),
                });
            }
        }

        for (name, ext_lib) in &self.ext_libs {
            ext_lib.validate(name)?;
        }

        // flavors are built concurrently and must not write to the same tree
        let mut roots: Vec<(PathBuf, &str)> = Vec::new();
        for name in self.flavor_names() {
            let root = self.flavor_build_root(name);
            if let Some((_, other)) = roots.iter().find(|(seen, _)| *seen == root) {
                return Err(ConfigError::InvalidValue {
                    field: format!("flavors.{}.build_root", name),
                    reason: format!(
                        "flavors '{}' and '{}' share the build root '{}'",
                        other,
                        name,
                        root.display()
                    ),
                });
            }
            roots.push((root, name));
        }

        Ok(())
    }

    /// Build root of a flavor relative to the project root:
    /// its `build_root` override, else `<build_base>/<flavor>`
    pub fn flavor_build_root(&self, name: &str) -> PathBuf {
        self.flavors
            .get(name)
            .and_then(|flavor| flavor.build_root.clone())
            .or_else(|| self.common.build_root.clone())
            .unwrap_or_else(|| self.site.build_base.join(name))
    }

    /// Names of the selectable flavors, sorted.
    ///
    /// Flavors whose name starts with `_` are hidden.
    pub fn flavor_names(&self) -> Vec<&str> {
        self.flavors
            .keys()
            .map(String::as_str)
            .filter(|name| !name.starts_with('_'))
            .collect()
    }

    /// Check whether `name` is a selectable flavor
    pub fn has_flavor(&self, name: &str) -> bool {
        !name.starts_with('_') && self.flavors.contains_key(name)
    }

    /// Effective settings of a flavor: common settings with the flavor layered on top
    pub fn flavor_settings(&self, name: &str) -> Option<ToolchainSettings> {
        if !self.has_flavor(name) {
            return None;
        }
        let mut settings = self.common.clone();
        settings.layer(&self.flavors[name]);
        Some(settings)
    }

    /// Look up an external library by name
    pub fn ext_lib(&self, name: &str) -> Option<&ExtLibConfig> {
        self.ext_libs.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[site]
modules = ["AddressBook", "Writer"]

[flavors.debug]
"#;

    #[test]
    fn test_parse_minimal_site_config() {
        let config = SiteConfig::parse(MINIMAL, Path::new("site.toml")).unwrap();
        assert_eq!(config.site.modules, vec!["AddressBook", "Writer"]);
        assert_eq!(config.site.build_base, PathBuf::from("build"));
        assert!(config.site.parallel);
        assert_eq!(config.flavor_names(), vec!["debug"]);
    }

    #[test]
    fn test_parse_full_site_config() {
        let content = r##"
[site]
build_base = "out"
modules = ["lib1", "app"]
parallel = false

[common]
cc = "clang"
cxx = "clang++"
flags = ["-std=c++11", "-Wall"]
include_paths = ["#", "$BUILDROOT"]

[flavors.debug]
flags = ["-g"]
defines = ["DEBUG"]

[flavors.release]
cxx = "g++"
flags = ["-O2"]
defines = ["NDEBUG"]

[ext_libs.protobuf]
include_paths = ["/usr/local/include"]
"##;
        let config = SiteConfig::parse(content, Path::new("site.toml")).unwrap();
        assert_eq!(config.site.build_base, PathBuf::from("out"));
        assert!(!config.site.parallel);
        assert_eq!(config.flavor_names(), vec!["debug", "release"]);
        assert!(config.ext_lib("protobuf").is_some());
        assert_eq!(config.common.include_paths, vec!["#", "$BUILDROOT"]);
    }

    #[test]
    fn test_flavor_settings_override_and_extend() {
        let mut config = SiteConfig::default();
        config.common.cxx = Some("clang++".to_string());
        config.common.flags = vec!["-Wall".to_string()];
        config.flavors.insert(
            "release".to_string(),
            ToolchainSettings {
                cxx: Some("g++".to_string()),
                flags: vec!["-O2".to_string()],
                ..Default::default()
            },
        );

        let settings = config.flavor_settings("release").unwrap();
        assert_eq!(settings.cxx.as_deref(), Some("g++"));
        assert_eq!(settings.flags, vec!["-Wall", "-O2"]);
        // common settings themselves are untouched
        assert_eq!(config.common.flags, vec!["-Wall"]);
    }

    #[test]
    fn test_hidden_flavors_are_not_selectable() {
        let content = r#"
[flavors._base]
flags = ["-pipe"]

[flavors.debug]
"#;
        let config = SiteConfig::parse(content, Path::new("site.toml")).unwrap();
        assert_eq!(config.flavor_names(), vec!["debug"]);
        assert!(!config.has_flavor("_base"));
        assert!(config.flavor_settings("_base").is_none());
    }

    #[test]
    fn test_no_flavors_is_invalid() {
        let content = r#"
[site]
modules = ["a"]
"#;
        let result = SiteConfig::parse(content, Path::new("site.toml"));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_duplicate_module_is_invalid() {
        let content = r#"
[site]
modules = ["a", "b", "a"]

[flavors.debug]
"#;
        let result = SiteConfig::parse(content, Path::new("site.toml"));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_flavors_sharing_a_build_root_are_invalid() {
        let content = r#"
[flavors.debug]
build_root = "out/shared"

[flavors.release]
build_root = "out/shared/"
"#;
        let err = SiteConfig::parse(content, Path::new("site.toml")).unwrap_err();
        match err {
            ConfigError::InvalidValue { field, reason } => {
                assert_eq!(field, "flavors.release.build_root");
                assert!(reason.contains("'debug' and 'release'"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_override_colliding_with_default_build_root_is_invalid() {
        let content = r#"
[flavors.debug]

[flavors.release]
build_root = "build/debug"
"#;
        assert!(matches!(
            SiteConfig::parse(content, Path::new("site.toml")),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_hidden_flavor_may_share_build_root() {
        let content = r#"
[flavors._base]
build_root = "build/debug"

[flavors.debug]
"#;
        let config = SiteConfig::parse(content, Path::new("site.toml")).unwrap();
        assert_eq!(config.flavor_build_root("debug"), PathBuf::from("build/debug"));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let content = r#"
[site]
modulez = ["a"]

[flavors.debug]
"#;
        let result = SiteConfig::parse(content, Path::new("site.toml"));
        assert!(matches!(result, Err(ConfigError::TomlParseError { .. })));
    }
}
