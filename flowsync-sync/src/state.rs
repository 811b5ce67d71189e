//! Persisted last-synced state: a mirror of the local tree under `<root>/.wmill`.
//!
//! # Storage layout
//!
//! ```text
//! <root>/.wmill/
//!   f/team/job.py
//!   f/team/job.script.yaml
//!   ...
//! ```
//!
//! One file per tracked artifact path, created lazily. Writes go through a
//! `.tmp` sibling and a rename.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::{io_err, SyncError};

pub const STATE_DIR: &str = ".wmill";

#[derive(Debug, Clone)]
pub struct StateMirror {
    dir: PathBuf,
}

impl StateMirror {
    /// Mirror for the sync root `root`.
    pub fn at(root: &Path) -> Self {
        Self {
            dir: root.join(STATE_DIR),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file(&self, path: &str) -> PathBuf {
        self.dir.join(path)
    }

    /// Last-synced content of `path`; `None` when never synced.
    pub async fn read(&self, path: &str) -> Result<Option<String>, SyncError> {
        let file = self.file(path);
        match fs::read_to_string(&file).await {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_err(file, err)),
        }
    }

    pub async fn write(&self, path: &str, content: &str) -> Result<(), SyncError> {
        let file = self.file(path);
        write_atomic(&file, content).await
    }

    /// Forget `path`. Already absent is fine.
    pub async fn remove(&self, path: &str) -> Result<(), SyncError> {
        remove_if_present(&self.file(path)).await
    }
}

/// Create parent directories, write `<file>.tmp`, rename over `file`.
pub(crate) async fn write_atomic(file: &Path, content: &str) -> Result<(), SyncError> {
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| io_err(parent, e))?;
    }
    let mut tmp_name = file.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    fs::write(&tmp, content).await.map_err(|e| io_err(&tmp, e))?;
    if let Err(err) = fs::rename(&tmp, file).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(io_err(file, err));
    }
    Ok(())
}

pub(crate) async fn remove_if_present(file: &Path) -> Result<(), SyncError> {
    match fs::remove_file(file).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_err(file, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn write_read_remove() {
        let tmp = TempDir::new().unwrap();
        let state = StateMirror::at(tmp.path());
        assert_eq!(state.read("f/a/x.py").await.unwrap(), None);

        state.write("f/a/x.py", "print(1)").await.unwrap();
        assert_eq!(state.read("f/a/x.py").await.unwrap().as_deref(), Some("print(1)"));
        assert!(tmp.path().join(".wmill/f/a/x.py").exists());
        assert!(!tmp.path().join(".wmill/f/a/x.py.tmp").exists());

        state.remove("f/a/x.py").await.unwrap();
        state.remove("f/a/x.py").await.unwrap();
        assert_eq!(state.read("f/a/x.py").await.unwrap(), None);
    }
}
