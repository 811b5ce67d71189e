//! Virtual tree: one traversal interface over a real directory, a remote
//! archive, and nodes synthesized by flow expansion.
//!
//! Implementations:
//! - [`FsNode`](crate::fs_tree::FsNode) walks the local filesystem with `tokio::fs`
//! - archive nodes in [`archive`](crate::archive) read an in-memory zip lazily
//! - [`SyntheticLeaf`] holds content computed during traversal

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

use crate::error::SyncError;

pub type BoxNode = Box<dyn TreeNode>;

/// A node of a virtual tree: either a leaf with text content or a directory
/// with a lazy sequence of children.
///
/// Nodes are created during a traversal and dropped once visited.
#[async_trait]
pub trait TreeNode: Send + Sync {
    /// Relative, slash-separated path.
    fn path(&self) -> &str;

    fn is_directory(&self) -> bool;

    /// Lazy, finite, single-pass sequence of children. Empty for leaves.
    ///
    /// Recoverable problems (an unreadable directory) end the sequence early;
    /// an `Err` item is fatal for the traversal.
    fn children(&self) -> BoxStream<'_, Result<BoxNode, SyncError>> {
        stream::empty().boxed()
    }

    /// Decoded text content. Fails with [`SyncError::InvalidOperation`] on a
    /// directory.
    async fn content_text(&self) -> Result<String, SyncError>;
}

/// Error returned by `content_text` on directories.
pub(crate) fn not_a_leaf(path: &str) -> SyncError {
    SyncError::InvalidOperation {
        path: path.to_string(),
    }
}

/// A leaf whose content is already in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticLeaf {
    path: String,
    content: String,
}

impl SyntheticLeaf {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    pub fn boxed(self) -> BoxNode {
        Box::new(self)
    }
}

#[async_trait]
impl TreeNode for SyntheticLeaf {
    fn path(&self) -> &str {
        &self.path
    }

    fn is_directory(&self) -> bool {
        false
    }

    async fn content_text(&self) -> Result<String, SyncError> {
        Ok(self.content.clone())
    }
}

/// Join a parent path and a child name without a leading separator at the root.
pub(crate) fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn synthetic_leaf_has_no_children() {
        let leaf = SyntheticLeaf::new("f/a/x.py", "print(1)");
        assert_eq!(leaf.children().count().await, 0);
        assert_eq!(leaf.content_text().await.unwrap(), "print(1)");
    }

    #[test]
    fn join_path_at_root() {
        assert_eq!(join_path("", "f"), "f");
        assert_eq!(join_path("f", "a"), "f/a");
    }
}
