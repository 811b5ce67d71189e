//! Pull and push entrypoints used by the CLI.
//!
//! Both directions follow the same shape:
//!
//! 1. build the path filter (configuration errors stop the run here),
//! 2. fetch the remote archive,
//! 3. materialize the two sides concurrently,
//! 4. diff, list the changes and ask for confirmation,
//! 5. apply change by change.
//!
//! Anything failing in steps 1-3 aborts before a single write.

use std::path::Path;

use tracing::{info, warn};

use flowsync_core::config::read_ignore_at;
use flowsync_core::{Change, DefaultTs, Revision, Skips, StructuredFormat, SyncConfig, WorkspaceId};
use flowsync_filter::PathFilter;

use crate::apply::{apply_changes, ConflictPolicy, LocalTarget, Prompter, RemoteTarget, SyncReport};
use crate::archive::{ArchiveOptions, RemoteArchive};
use crate::diff::compute_changes;
use crate::error::SyncError;
use crate::fs_tree::FsNode;
use crate::materialize::{materialize, MaterializeOptions};
use crate::remote::WorkspaceService;
use crate::state::StateMirror;

/// Collaborators for one run.
#[derive(Clone, Copy)]
pub struct SyncContext<'a> {
    /// Local sync root (holds `wmill.yaml`, `.wmillignore`, `.wmill/`).
    pub root: &'a Path,
    pub workspace: &'a WorkspaceId,
    pub service: &'a dyn WorkspaceService,
    pub prompter: &'a dyn Prompter,
}

/// Per-run switches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Compare against the local tree directly and skip `.wmill` tracking.
    pub raw: bool,
    pub yes: bool,
    pub fail_conflicts: bool,
    pub show_diffs: bool,
    pub format: StructuredFormat,
    pub default_ts: DefaultTs,
    pub skips: Skips,
    pub includes: Option<Vec<String>>,
}

impl SyncOptions {
    /// Options carried by `wmill.yaml`; per-run switches start off.
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            default_ts: config.default_ts,
            skips: config.skips(),
            includes: config.includes.clone(),
            ..Self::default()
        }
    }

    fn materialize_options(&self) -> MaterializeOptions {
        MaterializeOptions {
            format: self.format,
            skips: self.skips,
        }
    }

    fn policy(&self) -> ConflictPolicy {
        ConflictPolicy::from_flags(self.fail_conflicts, self.yes)
    }
}

/// Filter and remote archive, in that order.
async fn prepare(ctx: &SyncContext<'_>, opts: &SyncOptions) -> Result<(PathFilter, RemoteArchive), SyncError> {
    let ignore_file = read_ignore_at(ctx.root)?;
    let filter = PathFilter::new(opts.includes.as_deref(), ignore_file.as_deref())?;

    let version = match ctx.service.version().await {
        Ok(version) => {
            let revision = Revision::parse(&version);
            if revision.is_none() {
                warn!(%version, "unrecognized remote version, assuming current");
            }
            revision
        }
        Err(err) => {
            warn!(error = %err, "cannot read remote version, assuming current");
            None
        }
    };

    let bytes = ctx
        .service
        .download_archive(ctx.workspace, &opts.skips)
        .await?
        .ok_or_else(|| SyncError::EmptyArchive {
            workspace: ctx.workspace.to_string(),
        })?;
    let archive = RemoteArchive::open(bytes, ArchiveOptions::for_remote(opts.format, opts.default_ts, version))?;
    Ok((filter, archive))
}

/// List the changes and ask before writing. `false` means stop here.
fn confirmed(ctx: &SyncContext<'_>, opts: &SyncOptions, changes: &[Change]) -> bool {
    if changes.is_empty() {
        info!("everything up to date");
        return false;
    }
    ctx.prompter.show_changes(changes, opts.show_diffs);
    opts.yes || ctx.prompter.confirm(&format!("Apply {} change(s)?", changes.len()), true)
}

/// Reconcile the remote workspace into the local directory.
pub async fn pull(ctx: SyncContext<'_>, opts: &SyncOptions) -> Result<SyncReport, SyncError> {
    let (filter, archive) = prepare(&ctx, opts).await?;
    let state = (!opts.raw).then(|| StateMirror::at(ctx.root));
    let local_root = match &state {
        Some(state) => FsNode::root(state.dir()),
        None => FsNode::root(ctx.root),
    };

    let mopts = opts.materialize_options();
    let (remote, local) = tokio::try_join!(
        materialize(archive.root(), &filter, &mopts),
        materialize(local_root.boxed(), &filter, &mopts),
    )?;

    let changes = compute_changes(&remote, &local);
    if !confirmed(&ctx, opts, &changes) {
        return Ok(SyncReport::declined(changes));
    }

    let mut target = LocalTarget::new(ctx.root);
    Ok(apply_changes(changes, &mut target, state.as_ref(), opts.policy(), ctx.prompter).await)
}

/// Reconcile the local directory into the remote workspace.
pub async fn push(ctx: SyncContext<'_>, opts: &SyncOptions) -> Result<SyncReport, SyncError> {
    let (filter, archive) = prepare(&ctx, opts).await?;
    let state = (!opts.raw).then(|| StateMirror::at(ctx.root));

    let mopts = opts.materialize_options();
    let (remote, local) = tokio::try_join!(
        materialize(archive.root(), &filter, &mopts),
        materialize(FsNode::root(ctx.root).boxed(), &filter, &mopts),
    )?;

    let changes = compute_changes(&local, &remote);
    if !confirmed(&ctx, opts, &changes) {
        return Ok(SyncReport::declined(changes));
    }

    let mut target = RemoteTarget::new(
        ctx.service,
        ctx.workspace,
        &remote,
        &local,
        opts.format,
        opts.default_ts,
    );
    Ok(apply_changes(changes, &mut target, state.as_ref(), opts.policy(), ctx.prompter).await)
}
