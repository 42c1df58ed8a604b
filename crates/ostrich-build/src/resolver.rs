//! Library dependency resolution
//!
//! Programs name the libraries they link by short name or by qualified
//! `module::library` key. Unlike general target queries, a dependency must
//! resolve to exactly one library: linking the wrong library, or several,
//! is never what the module author meant.

use crate::error::{BuildError, BuildResult};
use crate::names::{is_qualified, split_qualified};
use crate::registry::TargetRegistry;
use crate::targets::ArtifactHandle;

/// Resolves library dependencies against a registry snapshot
#[derive(Debug, Clone, Copy)]
pub struct LibraryResolver<'a> {
    registry: &'a TargetRegistry,
}

impl<'a> LibraryResolver<'a> {
    /// Create a resolver over `registry`
    pub fn new(registry: &'a TargetRegistry) -> Self {
        Self { registry }
    }

    /// Resolve one library dependency to its artifact handles
    pub fn resolve(&self, name: &str) -> BuildResult<Vec<ArtifactHandle>> {
        let key = self.resolve_key(name)?;
        Ok(self
            .registry
            .get(key)
            .map(|target| target.handles.clone())
            .unwrap_or_default())
    }

    /// Resolve several dependencies, concatenating their handles in order
    pub fn resolve_all<S: AsRef<str>>(&self, names: &[S]) -> BuildResult<Vec<ArtifactHandle>> {
        let mut handles = Vec::new();
        for name in names {
            handles.extend(self.resolve(name.as_ref())?);
        }
        Ok(handles)
    }

    /// Find the single registry key a dependency name refers to
    pub fn resolve_key(&self, name: &str) -> BuildResult<&'a str> {
        if is_qualified(name) {
            return self
                .registry
                .libraries()
                .map(|(key, _)| key)
                .find(|key| *key == name)
                .ok_or_else(|| BuildError::unknown_library(name));
        }

        let candidates: Vec<&'a str> = self
            .registry
            .libraries()
            .map(|(key, _)| key)
            .filter(|key| matches!(split_qualified(key), Some((_, target)) if target == name))
            .collect();

        match candidates.as_slice() {
            [] => Err(BuildError::unknown_library(name)),
            [key] => Ok(*key),
            _ => Err(BuildError::AmbiguousLibrary {
                name: name.to_string(),
                candidates: candidates.iter().map(|key| key.to_string()).collect(),
            }),
        }
    }
}

impl TargetRegistry {
    /// Library resolver over this registry
    pub fn library_resolver(&self) -> LibraryResolver<'_> {
        LibraryResolver::new(self)
    }
}
