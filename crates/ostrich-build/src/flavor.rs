//! Build flavors
//!
//! A flavor (debug, release, ...) is a named set of toolchain settings with
//! its own build root. Every flavor is built with its own environment and
//! its own target registry.

use crate::error::{BuildError, BuildResult};
use crate::names::ModulePath;
use ostrich_config::{Config, ExtLibConfig, SiteConfig};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable selecting a single active flavor
pub const FLAVOR_ENV_VAR: &str = "BUILD_FLAVOR";

/// Placeholder for the flavor build root in configured paths
pub const BUILDROOT_VAR: &str = "$BUILDROOT";

/// Compiler and archiver commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toolchain {
    pub cc: String,
    pub cxx: String,
    pub ar: String,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            cc: "cc".to_string(),
            cxx: "c++".to_string(),
            ar: "ar".to_string(),
        }
    }
}

impl Toolchain {
    /// Compiler for a source file: `cc` for C sources, `cxx` otherwise
    pub fn compiler_for(&self, source: &Path) -> &str {
        match source.extension().and_then(|ext| ext.to_str()) {
            Some("c") => &self.cc,
            _ => &self.cxx,
        }
    }
}

/// Resolved settings of one flavor
#[derive(Debug, Clone, Serialize)]
pub struct FlavorEnv {
    /// Flavor name
    pub name: String,
    /// Project root directory
    pub project_root: PathBuf,
    /// Root of this flavor's outputs
    pub build_root: PathBuf,
    /// Where programs are installed
    pub bin_dir: PathBuf,
    pub toolchain: Toolchain,
    pub flags: Vec<String>,
    pub defines: Vec<String>,
    /// Include paths, already expanded
    pub include_paths: Vec<PathBuf>,
    pub link_flags: Vec<String>,
    /// External libraries modules may reference
    #[serde(skip)]
    pub ext_libs: BTreeMap<String, ExtLibConfig>,
}

impl FlavorEnv {
    /// Build the environment of `flavor` from the loaded configuration
    pub fn new(config: &Config, flavor: &str) -> BuildResult<Self> {
        Self::from_site(&config.site, config.project_root(), flavor)
    }

    /// Build the environment of `flavor` from site settings and a project root
    pub fn from_site(site: &SiteConfig, project_root: &Path, flavor: &str) -> BuildResult<Self> {
        let settings = site
            .flavor_settings(flavor)
            .ok_or_else(|| BuildError::unknown_flavor(flavor, &site.flavor_names()))?;

        let build_root = project_root.join(site.flavor_build_root(flavor));

        let defaults = Toolchain::default();
        let toolchain = Toolchain {
            cc: settings.cc.clone().unwrap_or(defaults.cc),
            cxx: settings.cxx.clone().unwrap_or(defaults.cxx),
            ar: settings.ar.clone().unwrap_or(defaults.ar),
        };

        let mut env = Self {
            name: flavor.to_string(),
            project_root: project_root.to_path_buf(),
            bin_dir: build_root.join("bin"),
            build_root,
            toolchain,
            flags: settings.flags.clone(),
            defines: settings.defines.clone(),
            include_paths: Vec::new(),
            link_flags: settings.link_flags.clone(),
            ext_libs: site.ext_libs.clone(),
        };
        env.include_paths = settings
            .include_paths
            .iter()
            .map(|raw| env.expand_path(raw, project_root))
            .collect();

        Ok(env)
    }

    /// Expand a configured path.
    ///
    /// A leading `#` makes the path relative to the project root,
    /// `$BUILDROOT` is replaced by the flavor build root, and other
    /// relative paths are joined onto `base`.
    pub fn expand_path(&self, raw: &str, base: &Path) -> PathBuf {
        let (raw, base) = match raw.strip_prefix('#') {
            Some(rest) => (rest.trim_start_matches(['/', '\\']), self.project_root.as_path()),
            None => (raw, base),
        };

        let expanded = raw.replace(BUILDROOT_VAR, &self.build_root.to_string_lossy());
        if expanded.is_empty() {
            return base.to_path_buf();
        }

        let path = PathBuf::from(expanded);
        if path.is_absolute() {
            path
        } else {
            base.join(path)
        }
    }

    /// Source directory of a module
    pub fn module_dir(&self, module: &ModulePath) -> PathBuf {
        self.project_root.join(module.as_str())
    }

    /// Output directory of a module in this flavor
    pub fn variant_dir(&self, module: &ModulePath) -> PathBuf {
        self.build_root.join(module.as_str())
    }

    /// Look up an external library
    pub fn ext_lib(&self, name: &str) -> Option<&ExtLibConfig> {
        self.ext_libs.get(name)
    }
}

/// Decide which flavors to build.
///
/// A flavor from the environment (`BUILD_FLAVOR`) wins over requested
/// flavors; with neither, every visible flavor is built. Any unknown
/// flavor is an error.
pub fn select_flavors<S: AsRef<str>>(
    site: &SiteConfig,
    requested: &[S],
    env_flavor: Option<&str>,
) -> BuildResult<Vec<String>> {
    let known = site.flavor_names();

    if let Some(flavor) = env_flavor {
        if !site.has_flavor(flavor) {
            return Err(BuildError::unknown_flavor(flavor, &known));
        }
        info!(flavor, "using active flavor from {}", FLAVOR_ENV_VAR);
        return Ok(vec![flavor.to_string()]);
    }

    if requested.is_empty() {
        return Ok(known.iter().map(|name| name.to_string()).collect());
    }

    let mut selected: Vec<String> = Vec::new();
    for flavor in requested {
        let flavor = flavor.as_ref();
        if !site.has_flavor(flavor) {
            return Err(BuildError::unknown_flavor(flavor, &known));
        }
        if !selected.iter().any(|s| s == flavor) {
            selected.push(flavor.to_string());
        }
    }
    Ok(selected)
}
