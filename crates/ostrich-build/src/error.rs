/// Build system error types
use std::path::PathBuf;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Configuration error: {0}")]
    Config(#[from] ostrich_config::ConfigError),

    #[error("'{flavor}' is not a known flavor (known: {known})")]
    UnknownFlavor { flavor: String, known: String },

    #[error("Module descriptor not found: {path}")]
    DescriptorNotFound { path: PathBuf },

    #[error("Invalid module descriptor for '{module}': {error}")]
    InvalidDescriptor { module: String, error: String },

    #[error("Target '{target}' declared more than once (module '{module}', key '{key}')")]
    DuplicateTarget {
        module: String,
        target: String,
        key: String,
    },

    #[error("Library '{name}' not found, is it a typo?")]
    UnknownLibrary { name: String },

    #[error(
        "Library '{name}' is ambiguous, use a fully-qualified name (one of: {})",
        candidates.join(", ")
    )]
    AmbiguousLibrary {
        name: String,
        candidates: Vec<String>,
    },

    #[error("Invalid query '{query}': {error}")]
    InvalidQuery { query: String, error: String },

    #[error("External library '{name}' (used by '{target}') is not declared in site.toml")]
    UnknownExtLib { name: String, target: String },

    #[error("Command failed for {output}: `{command}` ({status})")]
    CommandFailed {
        output: PathBuf,
        command: String,
        status: String,
    },

    #[error("I/O error at {path}: {error}")]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("Build failed: {0}")]
    BuildFailed(String),
}

impl BuildError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }

    /// Create an invalid descriptor error
    pub fn invalid_descriptor(module: impl Into<String>, error: impl ToString) -> Self {
        Self::InvalidDescriptor {
            module: module.into(),
            error: error.to_string(),
        }
    }

    /// Create an unknown library error
    pub fn unknown_library(name: impl Into<String>) -> Self {
        Self::UnknownLibrary { name: name.into() }
    }

    /// Create an unknown flavor error listing the known flavors
    pub fn unknown_flavor<S: AsRef<str>>(flavor: impl Into<String>, known: &[S]) -> Self {
        Self::UnknownFlavor {
            flavor: flavor.into(),
            known: known
                .iter()
                .map(|s| s.as_ref())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}
