//! Remote workspace service seam.
//!
//! The engine only needs four things from the remote: its version string, the
//! workspace archive, and per-artifact upsert/delete. Transport, auth, retries
//! and timeouts live in the implementation.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;

use flowsync_core::{ArtifactKind, Skips, WorkspaceId};
use flowsync_flow::script_base;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{endpoint}: {message}")]
    Request { endpoint: String, message: String },

    /// The object does not exist remotely.
    #[error("not found: {0}")]
    NotFound(String),
}

/// A create-or-update of one remote object.
#[derive(Debug, Clone, PartialEq)]
pub struct Upsert {
    pub kind: ArtifactKind,
    /// Remote object path (suffix-stripped).
    pub path: String,
    pub payload: JsonValue,
}

/// Removal of one remote object, keyed by its suffix-stripped path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Deletion {
    pub kind: ArtifactKind,
    pub path: String,
}

#[async_trait]
pub trait WorkspaceService: Send + Sync {
    async fn version(&self) -> Result<String, ServiceError>;

    /// `None` when the workspace has nothing to export.
    async fn download_archive(
        &self,
        workspace: &WorkspaceId,
        skips: &Skips,
    ) -> Result<Option<Vec<u8>>, ServiceError>;

    async fn upsert(&self, workspace: &WorkspaceId, upsert: &Upsert) -> Result<(), ServiceError>;

    async fn delete(&self, workspace: &WorkspaceId, deletion: &Deletion) -> Result<(), ServiceError>;
}

/// Strip `.<kind>.json` / `.<kind>.yaml` from a structured artifact path.
pub fn strip_kind_suffix<'a>(path: &'a str, kind: &str) -> Option<&'a str> {
    [".json", ".yaml"].iter().find_map(|ext| {
        path.strip_suffix(ext)
            .and_then(|stem| stem.strip_suffix(kind))
            .and_then(|stem| stem.strip_suffix('.'))
    })
}

/// Remote object path for a local artifact file, if the file stands for a
/// whole object (as opposed to a lockfile or an inline script).
pub fn remote_path(path: &str) -> Option<(ArtifactKind, String)> {
    let kind = ArtifactKind::from_path(path)?;
    let remote = match kind {
        ArtifactKind::Flow => strip_container(path, ".flow/", "flow")?,
        ArtifactKind::App => strip_container(path, ".app/", "app")?,
        ArtifactKind::Script => script_base(path)?,
        ArtifactKind::Folder => {
            let dir = path
                .strip_suffix("/folder.meta.yaml")
                .or_else(|| path.strip_suffix("/folder.meta.json"))?;
            dir.rsplit('/').next()?
        }
        other => strip_kind_suffix(path, other.as_str())?,
    };
    Some((kind, remote.to_string()))
}

/// `f/a/b.flow/flow.yaml` → `f/a/b`; any other file in the directory → `None`.
fn strip_container<'a>(path: &'a str, marker: &str, document: &str) -> Option<&'a str> {
    let (stem, rest) = path.split_once(marker)?;
    let is_document = rest
        .strip_prefix(document)
        .is_some_and(|ext| ext == ".yaml" || ext == ".json");
    is_document.then_some(stem)
}

/// The remote deletion matching a local file that disappeared.
pub fn deletion_for(path: &str) -> Option<Deletion> {
    remote_path(path).map(|(kind, path)| Deletion { kind, path })
}
