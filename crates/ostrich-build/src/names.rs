//! Module and target naming
//!
//! Modules are identified by their directory path relative to the project
//! root. Registry keys flatten that path into a name key (`a/b` becomes
//! `a.b`) and qualify targets as `module::target`.

use std::fmt;

/// Separator between the module part and the target part of a qualified key
pub const QUALIFIER: &str = "::";

/// Convert a path-like identifier to a flat key by replacing path separators with `.`
pub fn to_key(path: &str) -> String {
    path.replace(['/', '\\'], ".")
}

/// Compose a qualified `module::target` key from two name keys
pub fn qualify(module_key: &str, target_key: &str) -> String {
    format!("{}{}{}", module_key, QUALIFIER, target_key)
}

/// Whether `s` is a fully-qualified `module::target` name
pub fn is_qualified(s: &str) -> bool {
    s.contains(QUALIFIER)
}

/// Split a qualified key into its module and target parts
pub fn split_qualified(key: &str) -> Option<(&str, &str)> {
    key.split_once(QUALIFIER)
}

/// Path of a module directory, relative to the project root
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModulePath(String);

impl ModulePath {
    /// Create a module path, trimming trailing separators
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let trimmed = path.trim_end_matches(['/', '\\']);
        Self(trimmed.to_string())
    }

    /// The path as written in the module list
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Flat name key of this module
    pub fn key(&self) -> String {
        to_key(&self.0)
    }

    /// Qualified registry key of `target` declared in this module
    pub fn qualify(&self, target: &str) -> String {
        qualify(&self.key(), &to_key(target))
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModulePath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for ModulePath {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}
