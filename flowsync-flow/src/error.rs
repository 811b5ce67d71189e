//! Error types for flowsync-flow.

use thiserror::Error;

/// All errors that can arise while expanding, recombining or serializing
/// structured documents.
#[derive(Debug, Error)]
pub enum FlowError {
    /// JSON parse or serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parse or serialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// An `!inline` reference points at a file that is not in the flow directory.
    #[error("inline reference '{name}' has no matching file")]
    MissingInline { name: String },
}
