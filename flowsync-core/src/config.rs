//! Sync-root configuration.
//!
//! # Storage layout
//!
//! ```text
//! <root>/
//!   wmill.yaml      (SyncConfig, optional, defaults when absent)
//!   .wmillignore    (gitignore-style deny list, optional)
//! ```
//!
//! Saving goes through a `wmill.yaml.tmp` sibling and a rename, so a crash
//! never leaves a half-written config behind.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};
use crate::types::{DefaultTs, Skips};

pub const CONFIG_FILE: &str = "wmill.yaml";
pub const IGNORE_FILE: &str = ".wmillignore";

/// Contents of `wmill.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfig {
    pub default_ts: DefaultTs,
    /// Glob allow-list; a file is only synced when one of these matches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub includes: Option<Vec<String>>,
    pub skip_variables: bool,
    pub skip_resources: bool,
    pub skip_secrets: bool,
    pub include_schedules: bool,
}

impl SyncConfig {
    pub fn skips(&self) -> Skips {
        Skips {
            skip_variables: self.skip_variables,
            skip_resources: self.skip_resources,
            skip_secrets: self.skip_secrets,
            include_schedules: self.include_schedules,
        }
    }
}

/// `<root>/wmill.yaml`. Pure, no I/O.
pub fn config_path_at(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Load `<root>/wmill.yaml`, falling back to defaults when it is absent.
///
/// Returns `ConfigError::Parse` (with path + line context) if malformed.
pub fn load_at(root: &Path) -> Result<SyncConfig, ConfigError> {
    let path = config_path_at(root);
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(SyncConfig::default()),
        Err(err) => return Err(io_err(path, err)),
    };
    if contents.trim().is_empty() {
        return Ok(SyncConfig::default());
    }
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
}

/// Atomically save `config` to `<root>/wmill.yaml`.
pub fn save_at(root: &Path, config: &SyncConfig) -> Result<(), ConfigError> {
    let path = config_path_at(root);
    let tmp_path = path.with_file_name(format!("{CONFIG_FILE}.tmp"));

    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp_path, yaml).map_err(|e| io_err(&tmp_path, e))?;
    if let Err(e) = std::fs::rename(&tmp_path, &path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(io_err(path, e));
    }
    Ok(())
}

/// Write a default `wmill.yaml` unless one already exists.
///
/// Returns `true` when a file was created.
pub fn init_at(root: &Path) -> Result<bool, ConfigError> {
    if config_path_at(root).exists() {
        return Ok(false);
    }
    std::fs::create_dir_all(root).map_err(|e| io_err(root, e))?;
    save_at(root, &SyncConfig::default())?;
    Ok(true)
}

/// Read `<root>/.wmillignore`, if present.
pub fn read_ignore_at(root: &Path) -> Result<Option<String>, ConfigError> {
    let path = root.join(IGNORE_FILE);
    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_err(path, err)),
    }
}
