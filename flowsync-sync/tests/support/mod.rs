//! Shared fixtures: in-memory archives, a recording workspace service and a
//! scripted prompter.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use flowsync_core::{Change, Skips, WorkspaceId};
use flowsync_sync::{Deletion, Prompter, ServiceError, Upsert, WorkspaceService};

// ---------------------------------------------------------------------------
// Archives
// ---------------------------------------------------------------------------

pub fn zip_of(entries: &[(&str, String)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, content) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

pub fn flow_json(body: &str) -> String {
    json!({
        "summary": "ETL",
        "description": "",
        "value": {
            "modules": [{
                "id": "a",
                "summary": "Fetch",
                "value": {
                    "type": "rawscript",
                    "language": "python3",
                    "content": body,
                    "lock": "pandas==2.2.0\n",
                    "input_transforms": {}
                }
            }]
        },
        "schema": {}
    })
    .to_string()
}

/// A small workspace: one script with a lock, one flow, one resource, one
/// secret variable, one schedule and a root-level file.
pub fn workspace_entries(script_body: &str) -> Vec<(&'static str, String)> {
    vec![
        ("f/team/job.py", script_body.to_string()),
        (
            "f/team/job.script.json",
            json!({
                "summary": "Job",
                "description": "",
                "schema": {},
                "lock": "requests==2.31.0\n"
            })
            .to_string(),
        ),
        ("f/team/etl.flow/flow.json", flow_json("def main():\n    return 1\n")),
        (
            "f/team/db.resource.json",
            json!({"value": {"host": "db"}, "resource_type": "postgresql", "description": ""}).to_string(),
        ),
        (
            "u/alice/token.variable.json",
            json!({"value": "", "is_secret": true, "description": ""}).to_string(),
        ),
        (
            "f/team/nightly.schedule.json",
            json!({"schedule": "0 0 * * *", "script_path": "f/team/job", "is_flow": false}).to_string(),
        ),
        ("settings.json", json!({"name": "team"}).to_string()),
    ]
}

pub fn workspace_zip(script_body: &str) -> Vec<u8> {
    zip_of(&workspace_entries(script_body))
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Serves a fixed archive and records every write.
pub struct FakeService {
    pub version: Option<String>,
    pub archive: Mutex<Option<Vec<u8>>>,
    pub upserts: Mutex<Vec<Upsert>>,
    pub deletions: Mutex<Vec<Deletion>>,
    pub downloads: AtomicUsize,
}

impl FakeService {
    pub fn new(archive: Vec<u8>) -> Self {
        Self {
            version: Some("CE v1.400.0".to_string()),
            archive: Mutex::new(Some(archive)),
            upserts: Mutex::new(Vec::new()),
            deletions: Mutex::new(Vec::new()),
            downloads: AtomicUsize::new(0),
        }
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    pub fn replace_archive(&self, archive: Vec<u8>) {
        *self.archive.lock().unwrap() = Some(archive);
    }

    pub fn upserts(&self) -> Vec<Upsert> {
        self.upserts.lock().unwrap().clone()
    }

    pub fn deletions(&self) -> Vec<Deletion> {
        self.deletions.lock().unwrap().clone()
    }

    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkspaceService for FakeService {
    async fn version(&self) -> Result<String, ServiceError> {
        self.version.clone().ok_or_else(|| ServiceError::Request {
            endpoint: "/api/version".into(),
            message: "unavailable".into(),
        })
    }

    async fn download_archive(
        &self,
        _workspace: &WorkspaceId,
        _skips: &Skips,
    ) -> Result<Option<Vec<u8>>, ServiceError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        Ok(self.archive.lock().unwrap().clone())
    }

    async fn upsert(&self, _workspace: &WorkspaceId, upsert: &Upsert) -> Result<(), ServiceError> {
        self.upserts.lock().unwrap().push(upsert.clone());
        Ok(())
    }

    async fn delete(&self, _workspace: &WorkspaceId, deletion: &Deletion) -> Result<(), ServiceError> {
        self.deletions.lock().unwrap().push(deletion.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Prompter
// ---------------------------------------------------------------------------

/// Answers confirmations from a queue (falling back to the default) and
/// records what it was shown.
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<bool>>,
    pub listed: Mutex<Vec<String>>,
    pub conflicts: Mutex<Vec<String>>,
    pub questions: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn answering(answers: &[bool]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().copied().collect()),
            ..Self::default()
        }
    }

    pub fn conflicts_shown(&self) -> Vec<String> {
        self.conflicts.lock().unwrap().clone()
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().unwrap().clone()
    }
}

impl Prompter for ScriptedPrompter {
    fn show_changes(&self, changes: &[Change], _show_diffs: bool) {
        let mut listed = self.listed.lock().unwrap();
        listed.extend(changes.iter().map(|c| c.path().to_string()));
    }

    fn show_conflict(&self, path: &str, _live: &str, _incoming: &str) {
        self.conflicts.lock().unwrap().push(path.to_string());
    }

    fn confirm(&self, message: &str, default: bool) -> bool {
        self.questions.lock().unwrap().push(message.to_string());
        self.answers.lock().unwrap().pop_front().unwrap_or(default)
    }
}
