//! Local directory tree backed by `tokio::fs`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::fs::{self, ReadDir};
use tracing::{debug, warn};

use crate::error::{io_err, SyncError};
use crate::tree::{join_path, not_a_leaf, BoxNode, TreeNode};

/// A file or directory under a local root.
#[derive(Debug, Clone)]
pub struct FsNode {
    root: Arc<PathBuf>,
    path: String,
    is_dir: bool,
}

impl FsNode {
    /// The root directory itself. A missing root reads as an empty directory.
    pub fn root(dir: impl Into<PathBuf>) -> Self {
        Self {
            root: Arc::new(dir.into()),
            path: String::new(),
            is_dir: true,
        }
    }

    pub fn boxed(self) -> BoxNode {
        Box::new(self)
    }

    fn absolute(&self) -> PathBuf {
        if self.path.is_empty() {
            self.root.as_ref().clone()
        } else {
            self.root.join(&self.path)
        }
    }

    fn child(&self, name: &str, is_dir: bool) -> FsNode {
        FsNode {
            root: Arc::clone(&self.root),
            path: join_path(&self.path, name),
            is_dir,
        }
    }
}

enum Listing {
    Pending(FsNode),
    Open(FsNode, ReadDir),
}

async fn open_dir(dir: &Path) -> Option<ReadDir> {
    match fs::read_dir(dir).await {
        Ok(entries) => Some(entries),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(path = %dir.display(), "directory not found, treating as empty");
            None
        }
        Err(err) => {
            warn!(path = %dir.display(), error = %err, "cannot read directory, skipping");
            None
        }
    }
}

async fn next_child(listing: Listing) -> Option<(Result<BoxNode, SyncError>, Listing)> {
    let (parent, mut entries) = match listing {
        Listing::Pending(parent) => {
            let entries = open_dir(&parent.absolute()).await?;
            (parent, entries)
        }
        Listing::Open(parent, entries) => (parent, entries),
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(err) => {
                warn!(path = %parent.absolute().display(), error = %err, "directory listing interrupted");
                return None;
            }
        };
        let file_type = match entry.file_type().await {
            Ok(file_type) => file_type,
            Err(err) => {
                warn!(path = %entry.path().display(), error = %err, "cannot stat entry, skipping");
                continue;
            }
        };
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            warn!(path = %entry.path().display(), "non UTF-8 file name, skipping");
            continue;
        };
        let child = parent.child(&name, file_type.is_dir());
        return Some((Ok(child.boxed()), Listing::Open(parent, entries)));
    }
}

#[async_trait]
impl TreeNode for FsNode {
    fn path(&self) -> &str {
        &self.path
    }

    fn is_directory(&self) -> bool {
        self.is_dir
    }

    fn children(&self) -> BoxStream<'_, Result<BoxNode, SyncError>> {
        if !self.is_dir {
            return stream::empty().boxed();
        }
        stream::unfold(Listing::Pending(self.clone()), next_child).boxed()
    }

    async fn content_text(&self) -> Result<String, SyncError> {
        if self.is_dir {
            return Err(not_a_leaf(&self.path));
        }
        let path = self.absolute();
        fs::read_to_string(&path).await.map_err(|e| io_err(path, e))
    }
}
