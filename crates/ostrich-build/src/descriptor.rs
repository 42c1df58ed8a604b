//! Module build descriptors
//!
//! Every module directory carries a `module.toml` declaring the libraries
//! and programs the module builds.

use crate::error::{BuildError, BuildResult};
use crate::names::{is_qualified, ModulePath};
use crate::targets::TargetOptions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File name of a module's build descriptor
pub const DESCRIPTOR_FILE: &str = "module.toml";

/// Targets declared by one module
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleDescriptor {
    /// Libraries, built first and in declaration order
    #[serde(default, rename = "library")]
    pub libraries: Vec<LibraryDecl>,
    /// Programs, built after all libraries of the module
    #[serde(default, rename = "program")]
    pub programs: Vec<ProgramDecl>,
}

/// A `[[library]]` declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryDecl {
    pub name: String,
    pub sources: Vec<PathBuf>,
    /// External libraries from site.toml
    #[serde(default)]
    pub ext_libs: Vec<String>,
    #[serde(flatten)]
    pub options: TargetOptions,
}

/// A `[[program]]` declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramDecl {
    pub name: String,
    pub sources: Vec<PathBuf>,
    /// Libraries to link, each resolving to exactly one library
    #[serde(default)]
    pub deps: Vec<String>,
    /// Target queries whose outputs are added to the sources
    #[serde(default)]
    pub targets: Vec<String>,
    /// Do not warn when a `targets` query matches several targets
    #[serde(default)]
    pub no_multi_warn: bool,
    /// Install the program into the flavor's binary directory
    #[serde(default = "default_true")]
    pub install: bool,
    /// External libraries from site.toml
    #[serde(default)]
    pub ext_libs: Vec<String>,
    #[serde(flatten)]
    pub options: TargetOptions,
}

fn default_true() -> bool {
    true
}

impl LibraryDecl {
    /// Declare a library
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sources: Vec::new(),
            ext_libs: Vec::new(),
            options: TargetOptions::default(),
        }
    }

    /// Set source files
    pub fn with_sources<P: Into<PathBuf>>(mut self, sources: impl IntoIterator<Item = P>) -> Self {
        self.sources = sources.into_iter().map(Into::into).collect();
        self
    }

    /// Link against external libraries
    pub fn with_ext_libs(mut self, ext_libs: Vec<String>) -> Self {
        self.ext_libs = ext_libs;
        self
    }
}

impl ProgramDecl {
    /// Declare a program
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sources: Vec::new(),
            deps: Vec::new(),
            targets: Vec::new(),
            no_multi_warn: false,
            install: true,
            ext_libs: Vec::new(),
            options: TargetOptions::default(),
        }
    }

    /// Set source files
    pub fn with_sources<P: Into<PathBuf>>(mut self, sources: impl IntoIterator<Item = P>) -> Self {
        self.sources = sources.into_iter().map(Into::into).collect();
        self
    }

    /// Set library dependencies
    pub fn with_deps<S: Into<String>>(mut self, deps: impl IntoIterator<Item = S>) -> Self {
        self.deps = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Set target queries
    pub fn with_targets<S: Into<String>>(mut self, targets: impl IntoIterator<Item = S>) -> Self {
        self.targets = targets.into_iter().map(Into::into).collect();
        self
    }

    /// Enable/disable installation
    pub fn with_install(mut self, install: bool) -> Self {
        self.install = install;
        self
    }
}

impl ModuleDescriptor {
    /// Parse descriptor text for `module`
    pub fn parse(content: &str, module: &ModulePath) -> BuildResult<Self> {
        let descriptor: Self = toml::from_str(content)
            .map_err(|e| BuildError::invalid_descriptor(module.as_str(), e))?;
        descriptor.validate(module)?;
        Ok(descriptor)
    }

    /// Read and parse a descriptor file
    pub fn from_file(path: &Path, module: &ModulePath) -> BuildResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BuildError::DescriptorNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                BuildError::io(path, e)
            }
        })?;
        Self::parse(&content, module)
    }

    /// Add a library declaration
    pub fn with_library(mut self, library: LibraryDecl) -> Self {
        self.libraries.push(library);
        self
    }

    /// Add a program declaration
    pub fn with_program(mut self, program: ProgramDecl) -> Self {
        self.programs.push(program);
        self
    }

    /// Validate target names and sources.
    ///
    /// Duplicate names are left to the registry, which reports them with
    /// the qualified key.
    pub fn validate(&self, module: &ModulePath) -> BuildResult<()> {
        let invalid = |reason: String| BuildError::invalid_descriptor(module.as_str(), reason);

        let declared = self
            .libraries
            .iter()
            .map(|lib| (&lib.name, &lib.sources))
            .chain(self.programs.iter().map(|prog| (&prog.name, &prog.sources)));

        for (name, sources) in declared {
            if name.is_empty() {
                return Err(invalid("target name cannot be empty".to_string()));
            }
            if is_qualified(name) || name.contains('*') {
                return Err(invalid(format!(
                    "target name '{}' cannot contain '::' or '*'",
                    name
                )));
            }
            if sources.is_empty() {
                return Err(invalid(format!("target '{}' has no source files", name)));
            }
        }

        if let Some(program) = self.programs.iter().find(|prog| prog.options.shared) {
            return Err(invalid(format!(
                "program '{}' cannot set 'shared'",
                program.name
            )));
        }

        Ok(())
    }
}

/// Where module descriptors come from
pub trait DescriptorSource {
    /// Load the descriptor of `module`
    fn load(&self, module: &ModulePath) -> BuildResult<ModuleDescriptor>;
}

/// Reads `<root>/<module>/module.toml`
#[derive(Debug, Clone)]
pub struct FsDescriptorSource {
    root: PathBuf,
}

impl FsDescriptorSource {
    /// Read descriptors below the project root
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of a module's descriptor file
    pub fn descriptor_path(&self, module: &ModulePath) -> PathBuf {
        self.root.join(module.as_str()).join(DESCRIPTOR_FILE)
    }
}

impl DescriptorSource for FsDescriptorSource {
    fn load(&self, module: &ModulePath) -> BuildResult<ModuleDescriptor> {
        ModuleDescriptor::from_file(&self.descriptor_path(module), module)
    }
}

impl DescriptorSource for BTreeMap<String, ModuleDescriptor> {
    fn load(&self, module: &ModulePath) -> BuildResult<ModuleDescriptor> {
        self.get(module.as_str())
            .cloned()
            .ok_or_else(|| BuildError::DescriptorNotFound {
                path: PathBuf::from(module.as_str()).join(DESCRIPTOR_FILE),
            })
    }
}
