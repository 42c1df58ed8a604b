//! Per-flavor target registry
//!
//! Maps qualified `module::target` keys to the artifacts a target produced.
//! Modules register their targets as they are processed, and later modules
//! look targets up by name, qualified key or wildcard.

use crate::error::{BuildError, BuildResult};
use crate::names::ModulePath;
use crate::query::{Query, QueryWarning};
use crate::targets::{ArtifactHandle, TargetKind};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// A target stored in the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisteredTarget {
    /// Library or program
    pub kind: TargetKind,
    /// Outputs, in the order the executor produced them
    pub handles: Vec<ArtifactHandle>,
}

/// Result of resolving a list of queries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// Matched keys, in query order
    pub keys: Vec<String>,
    /// Handles of all matched keys, concatenated in key order
    pub handles: Vec<ArtifactHandle>,
    /// Warnings raised while matching
    pub warnings: Vec<QueryWarning>,
}

/// Append-only mapping from qualified key to registered target
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct TargetRegistry {
    targets: BTreeMap<String, RegisteredTarget>,
}

impl TargetRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the outputs of `target` declared in `module`.
    ///
    /// Fails without modifying the registry if the qualified key already exists.
    pub fn insert(
        &mut self,
        module: &ModulePath,
        target: &str,
        kind: TargetKind,
        handles: Vec<ArtifactHandle>,
    ) -> BuildResult<()> {
        let key = module.qualify(target);
        if self.targets.contains_key(&key) {
            return Err(BuildError::DuplicateTarget {
                module: module.to_string(),
                target: target.to_string(),
                key,
            });
        }

        debug!(key = %key, %kind, outputs = handles.len(), "registered target");
        self.targets.insert(key, RegisteredTarget { kind, handles });
        Ok(())
    }

    /// Resolve queries to the handles of the targets they match.
    ///
    /// Each key is consumed by the first query that matches it. Matches of
    /// one query are taken in key order. Queries that match nothing, and
    /// name or qualified queries that match several targets (unless
    /// `suppress_multiple_warning` is set), produce warnings but never fail.
    pub fn resolve<S: AsRef<str>>(
        &self,
        queries: &[S],
        suppress_multiple_warning: bool,
    ) -> BuildResult<Resolution> {
        let mut resolution = Resolution::default();
        let mut consumed: HashSet<&str> = HashSet::new();

        for raw in queries {
            let query = Query::parse(raw.as_ref())?;

            let matches: Vec<&str> = self
                .targets
                .keys()
                .map(String::as_str)
                .filter(|key| !consumed.contains(key) && query.matches(key))
                .collect();

            if matches.is_empty() {
                warn!(query = %query, "target query had no matches");
                resolution.warnings.push(QueryWarning::NoMatches {
                    query: query.to_string(),
                });
            } else if matches.len() > 1 && query.warns_on_multiple() && !suppress_multiple_warning {
                warn!(query = %query, count = matches.len(), "target query had multiple matches");
                resolution.warnings.push(QueryWarning::MultipleMatches {
                    query: query.to_string(),
                    count: matches.len(),
                });
            }

            for key in matches {
                consumed.insert(key);
                resolution.keys.push(key.to_string());
                resolution
                    .handles
                    .extend(self.targets[key].handles.iter().cloned());
            }
        }

        Ok(resolution)
    }

    /// Look up a target by qualified key
    pub fn get(&self, key: &str) -> Option<&RegisteredTarget> {
        self.targets.get(key)
    }

    /// Check if a qualified key is registered
    pub fn contains(&self, key: &str) -> bool {
        self.targets.contains_key(key)
    }

    /// All registered keys, sorted
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.targets.keys().map(String::as_str)
    }

    /// All registered targets, sorted by key
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RegisteredTarget)> {
        self.targets.iter().map(|(key, target)| (key.as_str(), target))
    }

    /// Registered library targets, sorted by key
    pub fn libraries(&self) -> impl Iterator<Item = (&str, &RegisteredTarget)> {
        self.iter()
            .filter(|(_, target)| target.kind == TargetKind::Library)
    }

    /// Number of registered targets
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Check if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
