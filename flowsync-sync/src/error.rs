//! Error types for flowsync-sync.

use std::path::PathBuf;

use thiserror::Error;

use flowsync_core::ConfigError;
use flowsync_filter::FilterError;
use flowsync_flow::FlowError;

use crate::remote::ServiceError;

/// All errors that can arise while building snapshots or applying changes.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The remote archive could not be opened or an entry could not be read.
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Content was requested from a directory node.
    #[error("invalid operation: '{path}' is a directory and has no content")]
    InvalidOperation { path: String },

    /// Flow expansion or structured-text failure.
    #[error("{path}: {source}")]
    Flow {
        path: String,
        #[source]
        source: FlowError,
    },

    #[error("filter configuration error: {0}")]
    Filter(#[from] FilterError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("remote service error: {0}")]
    Service(#[from] ServiceError),

    /// The remote returned no archive for the workspace.
    #[error("workspace '{workspace}' returned no archive")]
    EmptyArchive { workspace: String },

    /// A local artifact is incomplete (e.g. a script without metadata).
    #[error("cannot push '{path}': {message}")]
    Incomplete { path: String, message: String },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

/// Convenience constructor for [`SyncError::Flow`].
pub(crate) fn flow_err(path: impl Into<String>, source: FlowError) -> SyncError {
    SyncError::Flow {
        path: path.into(),
        source,
    }
}
