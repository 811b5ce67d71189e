//! Domain types shared by every flowsync crate.
//!
//! Paths are always relative to the sync root and slash-separated, regardless
//! of the host platform; they double as snapshot keys.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed identifier for a remote workspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkspaceId(pub String);

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for WorkspaceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for WorkspaceId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Flattened view of a tree: relative path → text content.
///
/// A `BTreeMap` so that iteration order (and therefore diff order) is the
/// lexicographic byte order of the paths.
pub type Snapshot = BTreeMap<String, String>;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which structured-text family a run reads and writes. Exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StructuredFormat {
    #[default]
    Yaml,
    Json,
}

impl StructuredFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            StructuredFormat::Json
        } else {
            StructuredFormat::Yaml
        }
    }

    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            StructuredFormat::Yaml => "yaml",
            StructuredFormat::Json => "json",
        }
    }

    /// Extension of the family that is *not* active in this run.
    pub fn inactive_extension(&self) -> &'static str {
        match self {
            StructuredFormat::Yaml => "json",
            StructuredFormat::Json => "yaml",
        }
    }
}

impl fmt::Display for StructuredFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// TypeScript flavour that gets the plain `.ts` extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DefaultTs {
    #[default]
    Bun,
    Deno,
}

impl DefaultTs {
    pub fn language(&self) -> &'static str {
        match self {
            DefaultTs::Bun => "bun",
            DefaultTs::Deno => "deno",
        }
    }
}

/// The kind of workspace object a path belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Script,
    Flow,
    App,
    Folder,
    Resource,
    ResourceType,
    Variable,
    Schedule,
}

/// Source-file suffixes that mark a script body.
pub const SCRIPT_SUFFIXES: &[&str] = &[
    ".py",
    ".ts",
    ".go",
    ".sh",
    ".ps1",
    ".sql",
    ".gql",
    ".js",
    ".php",
    ".rs",
    ".cs",
    ".playbook.yml",
];

impl ArtifactKind {
    /// Infer the artifact kind from a relative, slash-separated path.
    ///
    /// Returns `None` for files that are not workspace artifacts.
    pub fn from_path(path: &str) -> Option<ArtifactKind> {
        if path.contains(".flow/") {
            return Some(ArtifactKind::Flow);
        }
        if path.contains(".app/") {
            return Some(ArtifactKind::App);
        }
        let file_name = path.rsplit('/').next().unwrap_or(path);
        if SCRIPT_SUFFIXES.iter().any(|s| file_name.ends_with(s)) {
            return Some(ArtifactKind::Script);
        }
        if file_name == "folder.meta.yaml" || file_name == "folder.meta.json" {
            return Some(ArtifactKind::Folder);
        }
        let mut segments = file_name.rsplit('.');
        let _ext = segments.next()?;
        match segments.next()? {
            "script" => Some(ArtifactKind::Script),
            "flow" => Some(ArtifactKind::Flow),
            "app" => Some(ArtifactKind::App),
            "resource" => Some(ArtifactKind::Resource),
            "resource-type" => Some(ArtifactKind::ResourceType),
            "variable" => Some(ArtifactKind::Variable),
            "schedule" => Some(ArtifactKind::Schedule),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Script => "script",
            ArtifactKind::Flow => "flow",
            ArtifactKind::App => "app",
            ArtifactKind::Folder => "folder",
            ArtifactKind::Resource => "resource",
            ArtifactKind::ResourceType => "resource-type",
            ArtifactKind::Variable => "variable",
            ArtifactKind::Schedule => "schedule",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Change
// ---------------------------------------------------------------------------

/// One difference between a "new" and an "old" snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Added {
        path: String,
        content: String,
    },
    Deleted {
        path: String,
    },
    Edited {
        path: String,
        before: String,
        after: String,
    },
}

impl Change {
    pub fn path(&self) -> &str {
        match self {
            Change::Added { path, .. } | Change::Deleted { path } | Change::Edited { path, .. } => {
                path
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Change::Added { .. } => "added",
            Change::Deleted { .. } => "deleted",
            Change::Edited { .. } => "edited",
        }
    }

    /// Content the change leaves behind, if any.
    pub fn incoming(&self) -> Option<&str> {
        match self {
            Change::Added { content, .. } => Some(content),
            Change::Edited { after, .. } => Some(after),
            Change::Deleted { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Skip flags
// ---------------------------------------------------------------------------

/// Content-class skip flags. Schedules are excluded unless asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Skips {
    pub skip_variables: bool,
    pub skip_resources: bool,
    pub skip_secrets: bool,
    pub include_schedules: bool,
}

// ---------------------------------------------------------------------------
// Revision
// ---------------------------------------------------------------------------

/// A `major.minor.patch` revision parsed out of a remote version string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Revision {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Revision {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Extract the first `x.y.z` token from strings such as `"CE v1.390.1-3-gabc"`.
    pub fn parse(version: &str) -> Option<Revision> {
        version.split_whitespace().find_map(|token| {
            let token = token.trim_start_matches(['v', 'V']);
            let mut parts = token.splitn(3, '.');
            let major = leading_number(parts.next()?)?;
            let minor = leading_number(parts.next()?)?;
            let patch = leading_number(parts.next()?)?;
            Some(Revision::new(major, minor, patch))
        })
    }
}

fn leading_number(s: &str) -> Option<u32> {
    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
