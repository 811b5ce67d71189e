//! Conflict-aware application of a change list.
//!
//! Changes are applied one at a time, in order. Before an edit overwrites its
//! target, the live content is compared with the expected prior content (the
//! persisted state copy, or the change's `before` side when there is none). If
//! the live content matches neither that nor the incoming content, both sides
//! changed since the last sync and the [`ConflictPolicy`] decides.
//!
//! A failing change is logged and recorded; the remaining changes still run.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::fs;
use tracing::{debug, error, info, warn};

use flowsync_core::{Change, DefaultTs, Snapshot, StructuredFormat, WorkspaceId};

use crate::error::{io_err, SyncError};
use crate::handlers::{default_handlers, parse_by_extension, ArtifactHandler, PushScope};
use crate::remote::{deletion_for, remote_path, ServiceError, Upsert, WorkspaceService};
use crate::state::{remove_if_present, write_atomic, StateMirror};

// ---------------------------------------------------------------------------
// Seams
// ---------------------------------------------------------------------------

/// User interaction: change listings, conflict diffs and yes/no questions.
pub trait Prompter: Send + Sync {
    /// List pending changes, with unified diffs for edits when `show_diffs`.
    fn show_changes(&self, changes: &[Change], show_diffs: bool);

    /// Render both sides of a conflict.
    fn show_conflict(&self, path: &str, live: &str, incoming: &str);

    fn confirm(&self, message: &str, default: bool) -> bool;
}

/// Where changes are written: the local directory or the remote workspace.
#[async_trait]
pub trait ApplyTarget: Send + Sync {
    /// Current content at `path`, `None` when absent.
    async fn read_live(&self, path: &str) -> Result<Option<String>, SyncError>;

    /// Write an added/edited file or remove a deleted one. Removing something
    /// already gone succeeds.
    async fn apply(&mut self, change: &Change) -> Result<(), SyncError>;
}

// ---------------------------------------------------------------------------
// Policy and report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Record the conflict and leave the target untouched.
    Fail,
    /// Incoming content wins.
    Overwrite,
    /// Show the diff and ask.
    Ask,
}

impl ConflictPolicy {
    pub fn from_flags(fail_conflicts: bool, yes: bool) -> Self {
        if fail_conflicts {
            ConflictPolicy::Fail
        } else if yes {
            ConflictPolicy::Overwrite
        } else {
            ConflictPolicy::Ask
        }
    }
}

/// Both sides of a path that changed on both ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub path: String,
    pub live: String,
    pub incoming: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub path: String,
    pub message: String,
}

/// Outcome of one pull or push.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub changes: Vec<Change>,
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
    pub conflicts: Vec<Conflict>,
    pub failures: Vec<Failure>,
}

impl SyncReport {
    /// A run the user declined before anything was written.
    pub fn declined(changes: Vec<Change>) -> Self {
        let skipped = changes.iter().map(|c| c.path().to_string()).collect();
        Self {
            changes,
            skipped,
            ..Self::default()
        }
    }

    /// `true` when conflicts were recorded (only happens with [`ConflictPolicy::Fail`]).
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

enum Outcome {
    Applied,
    Kept,
    Conflict(Conflict),
}

// ---------------------------------------------------------------------------
// Applier
// ---------------------------------------------------------------------------

/// Apply `changes` to `target` in order. `state` is updated after every
/// successful write; pass `None` to disable state tracking.
pub async fn apply_changes(
    changes: Vec<Change>,
    target: &mut dyn ApplyTarget,
    state: Option<&StateMirror>,
    policy: ConflictPolicy,
    prompter: &dyn Prompter,
) -> SyncReport {
    let mut report = SyncReport::default();

    for change in &changes {
        let path = change.path();
        match apply_one(change, target, state, policy, prompter).await {
            Ok(Outcome::Applied) => {
                info!(%path, change = change.label(), "applied");
                report.applied.push(path.to_string());
            }
            Ok(Outcome::Kept) => {
                info!(%path, "kept live content");
                report.skipped.push(path.to_string());
            }
            Ok(Outcome::Conflict(conflict)) => {
                warn!(%path, "conflict recorded");
                report.conflicts.push(conflict);
            }
            Err(err) => {
                error!(%path, error = %err, "failed to apply change");
                report.failures.push(Failure {
                    path: path.to_string(),
                    message: err.to_string(),
                });
            }
        }
    }

    report.changes = changes;
    report
}

async fn apply_one(
    change: &Change,
    target: &mut dyn ApplyTarget,
    state: Option<&StateMirror>,
    policy: ConflictPolicy,
    prompter: &dyn Prompter,
) -> Result<Outcome, SyncError> {
    if let Change::Edited {
        path,
        before,
        after,
    } = change
    {
        let expected = match state {
            Some(state) => state.read(path).await?,
            None => None,
        };
        let expected = expected.as_deref().unwrap_or(before.as_str());
        let live = target.read_live(path).await?;
        let live = live.as_deref();

        if live != Some(expected) && live != Some(after.as_str()) {
            let conflict = Conflict {
                path: path.clone(),
                live: live.unwrap_or_default().to_string(),
                incoming: after.clone(),
            };
            match policy {
                ConflictPolicy::Fail => return Ok(Outcome::Conflict(conflict)),
                ConflictPolicy::Overwrite => {
                    warn!(%path, "changed on both sides, overwriting with incoming content");
                }
                ConflictPolicy::Ask => {
                    prompter.show_conflict(path, &conflict.live, &conflict.incoming);
                    let question = format!("{path} changed on both sides. Overwrite with incoming content?");
                    if !prompter.confirm(&question, false) {
                        return Ok(Outcome::Kept);
                    }
                }
            }
        }
    }

    target.apply(change).await?;

    if let Some(state) = state {
        match change.incoming() {
            Some(content) => state.write(change.path(), content).await?,
            None => state.remove(change.path()).await?,
        }
    }
    Ok(Outcome::Applied)
}

// ---------------------------------------------------------------------------
// Targets
// ---------------------------------------------------------------------------

/// The local sync root.
#[derive(Debug, Clone)]
pub struct LocalTarget {
    root: PathBuf,
}

impl LocalTarget {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }
}

#[async_trait]
impl ApplyTarget for LocalTarget {
    async fn read_live(&self, path: &str) -> Result<Option<String>, SyncError> {
        let file = self.root.join(path);
        match fs::read_to_string(&file).await {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_err(file, err)),
        }
    }

    async fn apply(&mut self, change: &Change) -> Result<(), SyncError> {
        let file = self.root.join(change.path());
        match change.incoming() {
            Some(content) => write_atomic(&file, content).await,
            None => remove_if_present(&file).await,
        }
    }
}

/// The remote workspace. Live content is the remote snapshot taken for this
/// run; writes go through the kind handlers or a generic upsert/delete.
pub struct RemoteTarget<'a> {
    service: &'a dyn WorkspaceService,
    workspace: &'a WorkspaceId,
    remote: &'a Snapshot,
    local: &'a Snapshot,
    format: StructuredFormat,
    default_ts: DefaultTs,
    handlers: Vec<Box<dyn ArtifactHandler>>,
    synced: HashSet<String>,
}

impl<'a> RemoteTarget<'a> {
    pub fn new(
        service: &'a dyn WorkspaceService,
        workspace: &'a WorkspaceId,
        remote: &'a Snapshot,
        local: &'a Snapshot,
        format: StructuredFormat,
        default_ts: DefaultTs,
    ) -> Self {
        Self {
            service,
            workspace,
            remote,
            local,
            format,
            default_ts,
            handlers: default_handlers(),
            synced: HashSet::new(),
        }
    }

    async fn apply_generic(&self, change: &Change) -> Result<(), SyncError> {
        let path = change.path();
        let Some(content) = change.incoming() else {
            let Some(deletion) = deletion_for(path) else {
                debug!(%path, "no remote object to delete");
                return Ok(());
            };
            return match self.service.delete(self.workspace, &deletion).await {
                Ok(()) | Err(ServiceError::NotFound(_)) => Ok(()),
                Err(err) => Err(err.into()),
            };
        };

        let Some((kind, object_path)) = remote_path(path) else {
            debug!(%path, "not a remote object, nothing to push");
            return Ok(());
        };
        let mut payload = parse_by_extension(path, content)?;
        if let JsonValue::Object(map) = &mut payload {
            map.insert("path".into(), JsonValue::String(object_path.clone()));
        }
        let upsert = Upsert {
            kind,
            path: object_path,
            payload,
        };
        self.service.upsert(self.workspace, &upsert).await?;
        Ok(())
    }
}

#[async_trait]
impl ApplyTarget for RemoteTarget<'_> {
    async fn read_live(&self, path: &str) -> Result<Option<String>, SyncError> {
        Ok(self.remote.get(path).cloned())
    }

    async fn apply(&mut self, change: &Change) -> Result<(), SyncError> {
        let path = change.path();
        let Some(handler) = self.handlers.iter().find(|h| h.claims(path)) else {
            return self.apply_generic(change).await;
        };
        let scope = PushScope {
            service: self.service,
            workspace: self.workspace,
            local: self.local,
            format: self.format,
            default_ts: self.default_ts,
        };
        handler.handle(&scope, change, &mut self.synced).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_precedence() {
        assert_eq!(ConflictPolicy::from_flags(true, true), ConflictPolicy::Fail);
        assert_eq!(ConflictPolicy::from_flags(false, true), ConflictPolicy::Overwrite);
        assert_eq!(ConflictPolicy::from_flags(false, false), ConflictPolicy::Ask);
    }

    #[test]
    fn declined_report_skips_everything() {
        let report = SyncReport::declined(vec![Change::Deleted { path: "f/a.py".into() }]);
        assert_eq!(report.skipped, vec!["f/a.py".to_string()]);
        assert!(report.applied.is_empty());
        assert!(!report.has_conflicts());
    }
}
