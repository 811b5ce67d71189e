//! flowsync core library: domain types, sync configuration, errors.
//!
//! - [`types`]: artifact kinds, changes, snapshots, format and skip flags
//! - [`error`]: [`ConfigError`]
//! - [`config`]: `wmill.yaml` / `.wmillignore` load, save and init

pub mod config;
pub mod error;
pub mod types;

pub use config::SyncConfig;
pub use error::ConfigError;
pub use types::{
    ArtifactKind, Change, DefaultTs, Revision, Skips, Snapshot, StructuredFormat, WorkspaceId,
};
