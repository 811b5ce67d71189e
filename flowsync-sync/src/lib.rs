//! # flowsync-sync
//!
//! Two-way sync between a remote workspace archive and a local directory.
//!
//! Call [`pipeline::pull`] to bring remote changes into the local tree, or
//! [`pipeline::push`] to send local changes to the remote. Both build a
//! [`Snapshot`](flowsync_core::Snapshot) of each side from a virtual
//! [`tree`], diff them with [`diff::compute_changes`] and hand the result to
//! the conflict-aware [`apply`] step.

pub mod apply;
pub mod archive;
pub mod diff;
pub mod error;
pub mod fs_tree;
pub mod handlers;
pub mod materialize;
pub mod pipeline;
pub mod remote;
pub mod state;
pub mod tree;

pub use apply::{
    apply_changes, ApplyTarget, Conflict, ConflictPolicy, Failure, LocalTarget, Prompter,
    RemoteTarget, SyncReport,
};
pub use archive::{ArchiveOptions, RemoteArchive, LOCK_AS_STRING_SINCE};
pub use diff::{compute_changes, render_unified};
pub use error::SyncError;
pub use fs_tree::FsNode;
pub use materialize::{materialize, MaterializeOptions};
pub use pipeline::{pull, push, SyncContext, SyncOptions};
pub use remote::{deletion_for, Deletion, ServiceError, Upsert, WorkspaceService};
pub use state::StateMirror;
pub use tree::{BoxNode, SyntheticLeaf, TreeNode};
