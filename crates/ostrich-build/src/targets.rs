/// Build target types and artifact handles
use crate::names::ModulePath;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Kind of build target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// Library other targets link against
    Library,
    /// Executable program
    Program,
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Library => write!(f, "library"),
            Self::Program => write!(f, "program"),
        }
    }
}

/// Kind of a single build output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    /// Static archive
    StaticLibrary,
    /// Shared object
    SharedLibrary,
    /// Linked executable
    Executable,
}

impl ArtifactKind {
    /// Whether artifacts of this kind are installed to the binary directory
    pub fn is_installable(&self) -> bool {
        matches!(self, Self::Executable)
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StaticLibrary => write!(f, "static library"),
            Self::SharedLibrary => write!(f, "shared library"),
            Self::Executable => write!(f, "executable"),
        }
    }
}

/// Handle to one output node produced by the build executor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactHandle {
    /// What the output is
    pub kind: ArtifactKind,
    /// Where the output is written
    pub path: PathBuf,
}

impl ArtifactHandle {
    /// Create a new artifact handle
    pub fn new(kind: ArtifactKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    /// Output path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name of the output, or the whole path if it has none
    pub fn base_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }
}

impl std::fmt::Display for ArtifactHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// One entry in a target's source list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Source file, relative to the module directory
    File(PathBuf),
    /// Output of another target
    Artifact(ArtifactHandle),
}

impl Source {
    /// Create a file source
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }
}

impl From<ArtifactHandle> for Source {
    fn from(handle: ArtifactHandle) -> Self {
        Self::Artifact(handle)
    }
}

/// Per-target build options
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TargetOptions {
    /// Extra compiler flags
    #[serde(default)]
    pub flags: Vec<String>,
    /// Extra preprocessor defines (without the `-D`)
    #[serde(default)]
    pub defines: Vec<String>,
    /// Extra include search paths
    #[serde(default)]
    pub include_paths: Vec<String>,
    /// Extra library search paths
    #[serde(default)]
    pub lib_paths: Vec<String>,
    /// System libraries to link (without the `-l`)
    #[serde(default)]
    pub libs: Vec<String>,
    /// Extra linker flags
    #[serde(default)]
    pub link_flags: Vec<String>,
    /// Also produce a shared variant (libraries only)
    #[serde(default)]
    pub shared: bool,
}

impl TargetOptions {
    /// Merge an external library's search paths and link libraries into these options
    pub fn apply_ext_lib(&mut self, name: &str, ext_lib: &ostrich_config::ExtLibConfig) {
        push_unique(&mut self.include_paths, ext_lib.include_paths.iter().cloned());
        push_unique(&mut self.lib_paths, ext_lib.lib_paths.iter().cloned());
        push_unique(&mut self.libs, ext_lib.link_libs(name));
    }
}

fn push_unique(list: &mut Vec<String>, items: impl IntoIterator<Item = String>) {
    for item in items {
        if !list.contains(&item) {
            list.push(item);
        }
    }
}

/// Everything the executor needs to build one target
#[derive(Debug, Clone, Copy)]
pub struct TargetRequest<'a> {
    /// Module declaring the target
    pub module: &'a ModulePath,
    /// Target name
    pub name: &'a str,
    /// Sources, files first, then artifacts of dependencies
    pub sources: &'a [Source],
    /// Build options
    pub options: &'a TargetOptions,
}
