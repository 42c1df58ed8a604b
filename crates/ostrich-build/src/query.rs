//! Target queries
//!
//! The literal syntax of a query decides how it matches registry keys:
//! - contains `*`: wildcard over the whole `module::target` key
//! - contains `::`: exact fully-qualified key
//! - anything else: target name in any module

use crate::error::{BuildError, BuildResult};
use crate::names::{is_qualified, split_qualified};
use regex::Regex;
use serde::Serialize;
use std::fmt;

/// A classified target query
#[derive(Debug, Clone)]
pub enum Query {
    /// Glob over qualified keys, `*` matching any sequence
    Wildcard { pattern: String, regex: Regex },
    /// Exact `module::target` key
    Qualified(String),
    /// Target name, matched across all modules
    ShortName(String),
}

impl Query {
    /// Classify a query string
    pub fn parse(query: &str) -> BuildResult<Self> {
        if query.contains('*') {
            let escaped = regex::escape(query).replace(r"\*", ".*");
            let regex = Regex::new(&format!("^{}$", escaped)).map_err(|e| {
                BuildError::InvalidQuery {
                    query: query.to_string(),
                    error: e.to_string(),
                }
            })?;
            return Ok(Self::Wildcard {
                pattern: query.to_string(),
                regex,
            });
        }

        if is_qualified(query) {
            return Ok(Self::Qualified(query.to_string()));
        }

        Ok(Self::ShortName(query.to_string()))
    }

    /// The query as written
    pub fn as_str(&self) -> &str {
        match self {
            Self::Wildcard { pattern, .. } => pattern,
            Self::Qualified(key) => key,
            Self::ShortName(name) => name,
        }
    }

    /// Whether `key` satisfies this query
    pub fn matches(&self, key: &str) -> bool {
        match self {
            Self::Wildcard { regex, .. } => regex.is_match(key),
            Self::Qualified(qualified) => key == qualified,
            Self::ShortName(name) => match split_qualified(key) {
                Some((module, target)) => !module.contains(':') && target == name,
                None => false,
            },
        }
    }

    /// Whether more than one match is unexpected for this query.
    ///
    /// Wildcards exist to match many targets.
    pub fn warns_on_multiple(&self) -> bool {
        !matches!(self, Self::Wildcard { .. })
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-fatal diagnostic produced while resolving queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum QueryWarning {
    /// The query matched nothing, probably a typo
    NoMatches { query: String },
    /// A name or qualified query matched several targets
    MultipleMatches { query: String, count: usize },
}

impl QueryWarning {
    /// The query the warning is about
    pub fn query(&self) -> &str {
        match self {
            Self::NoMatches { query } | Self::MultipleMatches { query, .. } => query,
        }
    }
}

impl fmt::Display for QueryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMatches { query } => write!(f, "query \"{}\" had no matches", query),
            Self::MultipleMatches { query, count } => {
                write!(f, "query \"{}\" had {} matches", query, count)
            }
        }
    }
}
