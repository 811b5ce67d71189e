//! Path filter for `flowsync-filter`.
//!
//! [`PathFilter::is_excluded`] decides, for a relative slash-separated path and
//! whether it names a directory, if the path is left out of a snapshot. It
//! combines three sources:
//!
//! - an optional include allow-list of globs (`includes` in `wmill.yaml`),
//! - an optional gitignore-style deny list (`.wmillignore`),
//! - a built-in structural rule that keeps only the `u/`, `f/` and `g/`
//!   namespaces in scope.
//!
//! The allow-list and the deny list are mutually exclusive.

use std::path::Path;

use flowsync_core::config::{read_ignore_at, SyncConfig};
use flowsync_core::ConfigError;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Errors from building a filter. All of them are configuration errors.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("an include list and a .wmillignore file are mutually exclusive; remove one of them")]
    ConflictingSources,

    #[error("invalid include pattern '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("invalid .wmillignore line '{line}': {source}")]
    InvalidIgnore {
        line: String,
        #[source]
        source: ignore::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A compiled set of patterns answering "does this path match?".
///
/// The filter only sees this trait, so the pattern engine behind the allow and
/// deny lists can change without touching the combinator.
pub trait PathMatcher: Send + Sync {
    fn is_match(&self, path: &str, is_dir: bool) -> bool;
}

/// Glob allow-list. `*` does not cross `/`; use `**` for that.
#[derive(Debug, Clone)]
pub struct GlobAllowList {
    set: GlobSet,
}

impl GlobAllowList {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, FilterError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|source| FilterError::InvalidGlob {
                    pattern: pattern.to_string(),
                    source,
                })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|source| FilterError::InvalidGlob {
            pattern: patterns
                .iter()
                .map(|p| p.as_ref())
                .collect::<Vec<_>>()
                .join(", "),
            source,
        })?;
        Ok(Self { set })
    }
}

impl PathMatcher for GlobAllowList {
    fn is_match(&self, path: &str, _is_dir: bool) -> bool {
        self.set.is_match(path)
    }
}

/// Gitignore-semantics deny list. A path is hit when it, or any parent
/// directory of it, is ignored.
#[derive(Debug, Clone)]
pub struct IgnoreDenyList {
    matcher: Gitignore,
}

impl IgnoreDenyList {
    pub fn new(contents: &str) -> Result<Self, FilterError> {
        let mut builder = GitignoreBuilder::new(".");
        for line in contents.lines() {
            builder
                .add_line(None, line)
                .map_err(|source| FilterError::InvalidIgnore {
                    line: line.to_string(),
                    source,
                })?;
        }
        let matcher = builder.build().map_err(|source| FilterError::InvalidIgnore {
            line: String::new(),
            source,
        })?;
        Ok(Self { matcher })
    }
}

impl PathMatcher for IgnoreDenyList {
    fn is_match(&self, path: &str, is_dir: bool) -> bool {
        let path = path.trim_start_matches("./");
        if path.is_empty() {
            return false;
        }
        self.matcher
            .matched_path_or_any_parents(path, is_dir)
            .is_ignore()
    }
}

/// The exclusion predicate used by the snapshot materializer.
pub struct PathFilter {
    allow: Option<Box<dyn PathMatcher>>,
    deny: Option<Box<dyn PathMatcher>>,
}

impl std::fmt::Debug for PathFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathFilter")
            .field("allow", &self.allow.is_some())
            .field("deny", &self.deny.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Paths that are always in scope: the sync root and the three namespaces.
const ROOT_MARKERS: &[&str] = &["", "./", "u", "f", "g"];
const NAMESPACES: &[&str] = &["u/", "f/", "g/"];
const RESOURCE_TYPE_MARKER: &str = ".resource-type.";

impl PathFilter {
    /// Build a filter from an optional include list and optional `.wmillignore`
    /// contents. Supplying both is [`FilterError::ConflictingSources`].
    pub fn new(includes: Option<&[String]>, ignore_file: Option<&str>) -> Result<Self, FilterError> {
        match (includes, ignore_file) {
            (Some(_), Some(_)) => Err(FilterError::ConflictingSources),
            (Some(patterns), None) => Ok(Self::with_matchers(
                Some(Box::new(GlobAllowList::new(patterns)?)),
                None,
            )),
            (None, Some(contents)) => Ok(Self::with_matchers(
                None,
                Some(Box::new(IgnoreDenyList::new(contents)?)),
            )),
            (None, None) => Ok(Self::structural_only()),
        }
    }

    /// Filter for a sync root: `includes` from `config`, deny list from
    /// `<root>/.wmillignore`.
    pub fn from_root(root: &Path, config: &SyncConfig) -> Result<Self, FilterError> {
        let ignore_file = read_ignore_at(root)?;
        Self::new(config.includes.as_deref(), ignore_file.as_deref())
    }

    /// Only the built-in structural rule.
    pub fn structural_only() -> Self {
        Self {
            allow: None,
            deny: None,
        }
    }

    /// Assemble a filter from arbitrary matchers.
    pub fn with_matchers(
        allow: Option<Box<dyn PathMatcher>>,
        deny: Option<Box<dyn PathMatcher>>,
    ) -> Self {
        Self { allow, deny }
    }

    /// `true` when `path` must be left out of the snapshot.
    pub fn is_excluded(&self, path: &str, is_dir: bool) -> bool {
        if ROOT_MARKERS.contains(&path) {
            return false;
        }
        if structurally_excluded(path, is_dir) {
            return true;
        }
        if is_dir {
            return false;
        }
        let allow_miss = self
            .allow
            .as_ref()
            .is_some_and(|allow| !allow.is_match(path, false));
        let deny_hit = self
            .deny
            .as_ref()
            .is_some_and(|deny| deny.is_match(path, false));
        allow_miss || deny_hit
    }
}

// ---------------------------------------------------------------------------
// Structural rule
// ---------------------------------------------------------------------------

fn structurally_excluded(path: &str, is_dir: bool) -> bool {
    if path.ends_with('/') {
        return false;
    }
    let in_namespace = NAMESPACES.iter().any(|ns| path.starts_with(ns));
    if is_dir {
        return !in_namespace;
    }
    if path.contains(RESOURCE_TYPE_MARKER) {
        return !path.contains('/');
    }
    !in_namespace
}
