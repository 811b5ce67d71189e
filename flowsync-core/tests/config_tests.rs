//! Config error-message, atomic-write-safety, and init integration tests.

use assert_fs::prelude::*;
use flowsync_core::{config, ConfigError, SyncConfig};
use predicates::prelude::predicate;
use std::fs;

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn load_corrupt_yaml_returns_parse_error_with_path() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    fs::write(
        root.path().join("wmill.yaml"),
        b": : corrupt : yaml : !!!\n  - broken: [unclosed",
    )
    .expect("write");

    let err = config::load_at(root.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("wmill.yaml"));
}

#[test]
fn malformed_include_list_is_a_parse_error() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    root.child("wmill.yaml")
        .write_str("includes: f/**\n")
        .expect("write");

    let err = config::load_at(root.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
}

#[test]
fn empty_file_means_defaults() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    root.child("wmill.yaml").write_str("").expect("write");
    assert_eq!(config::load_at(root.path()).unwrap(), SyncConfig::default());
}

// ---------------------------------------------------------------------------
// 2. Atomic write safety
// ---------------------------------------------------------------------------

#[test]
fn mid_write_crash_leaves_original_intact() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    config::save_at(root.path(), &SyncConfig::default()).expect("save");

    let path = config::config_path_at(root.path());
    let original_bytes = fs::read(&path).expect("read original");

    // Simulate crash: .tmp written but process died before rename
    let tmp = path.with_file_name("wmill.yaml.tmp");
    fs::write(&tmp, b"CRASH - INCOMPLETE WRITE").expect("write crash tmp");

    assert_eq!(original_bytes, fs::read(&path).expect("read after crash"));
    assert_eq!(config::load_at(root.path()).unwrap(), SyncConfig::default());
}

// ---------------------------------------------------------------------------
// 3. Init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_default_config() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    assert!(config::init_at(root.path()).expect("init"));
    root.child("wmill.yaml").assert(predicate::path::exists());
    root.child("wmill.yaml")
        .assert(predicate::str::contains("defaultTs: bun"));
}
