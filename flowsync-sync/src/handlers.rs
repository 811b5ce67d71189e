//! Per-kind push handlers.
//!
//! A script or a flow is spread over several local files, but the remote
//! stores each as one object. A handler claims every change touching such an
//! artifact, rebuilds the object from the local snapshot and pushes it once
//! per run.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use flowsync_core::{ArtifactKind, Change, DefaultTs, Snapshot, StructuredFormat, WorkspaceId};
use flowsync_flow::script::inline_target;
use flowsync_flow::{language_for_path, parse_structured, recombine_flow, script_base};

use crate::error::{flow_err, SyncError};
use crate::remote::{Deletion, ServiceError, Upsert, WorkspaceService};

/// What a handler can see while pushing.
pub struct PushScope<'a> {
    pub service: &'a dyn WorkspaceService,
    pub workspace: &'a WorkspaceId,
    /// The local snapshot being pushed.
    pub local: &'a Snapshot,
    pub format: StructuredFormat,
    pub default_ts: DefaultTs,
}

impl PushScope<'_> {
    /// Files under `prefix`, keyed by the remainder of their path.
    fn files_under(&self, prefix: &str) -> HashMap<String, String> {
        self.local
            .range(prefix.to_string()..)
            .take_while(|(path, _)| path.starts_with(prefix))
            .map(|(path, content)| (path[prefix.len()..].to_string(), content.clone()))
            .collect()
    }

    async fn delete(&self, kind: ArtifactKind, path: &str) -> Result<(), SyncError> {
        let deletion = Deletion {
            kind,
            path: path.to_string(),
        };
        match self.service.delete(self.workspace, &deletion).await {
            Ok(()) | Err(ServiceError::NotFound(_)) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
pub trait ArtifactHandler: Send + Sync {
    fn claims(&self, path: &str) -> bool;

    /// Push the artifact `change` belongs to, unless its key is already in
    /// `synced`.
    async fn handle(
        &self,
        scope: &PushScope<'_>,
        change: &Change,
        synced: &mut HashSet<String>,
    ) -> Result<(), SyncError>;
}

/// Parse a structured file by its own extension.
pub(crate) fn parse_by_extension(path: &str, content: &str) -> Result<JsonValue, SyncError> {
    let format = if path.ends_with(".json") {
        StructuredFormat::Json
    } else {
        StructuredFormat::Yaml
    };
    parse_structured(content, format).map_err(|e| flow_err(path, e))
}

fn incomplete(path: &str, message: &str) -> SyncError {
    SyncError::Incomplete {
        path: path.to_string(),
        message: message.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Scripts
// ---------------------------------------------------------------------------

/// Owns script sources, `.script.<ext>` metadata and `.script.lock` files.
#[derive(Debug, Default)]
pub struct ScriptHandler;

const SCRIPT_SIDECARS: &[&str] = &[".script.yaml", ".script.json", ".script.lock"];

fn script_key(path: &str) -> Option<&str> {
    SCRIPT_SIDECARS
        .iter()
        .find_map(|suffix| path.strip_suffix(suffix))
        .or_else(|| script_base(path))
}

#[async_trait]
impl ArtifactHandler for ScriptHandler {
    fn claims(&self, path: &str) -> bool {
        !path.contains(".flow/")
            && !path.contains(".app/")
            && ArtifactKind::from_path(path) == Some(ArtifactKind::Script)
            && script_key(path).is_some()
    }

    async fn handle(
        &self,
        scope: &PushScope<'_>,
        change: &Change,
        synced: &mut HashSet<String>,
    ) -> Result<(), SyncError> {
        let path = change.path();
        let Some(base) = script_key(path) else {
            return Ok(());
        };
        if !synced.insert(base.to_string()) {
            debug!(%base, "script already pushed in this run");
            return Ok(());
        }

        let siblings = scope.files_under(&format!("{base}."));
        let source = siblings.iter().find_map(|(rest, content)| {
            let full = format!("{base}.{rest}");
            let language = language_for_path(&full, scope.default_ts)?;
            (script_base(&full) == Some(base)).then_some((language, content))
        });

        let Some((language, content)) = source else {
            if matches!(change, Change::Deleted { .. }) {
                return scope.delete(ArtifactKind::Script, base).await;
            }
            return Err(incomplete(path, "script source file is missing"));
        };

        let meta_name = format!("script.{}", scope.format.extension());
        let meta_path = format!("{base}.{meta_name}");
        let meta_text = siblings
            .get(&meta_name)
            .ok_or_else(|| incomplete(path, "script metadata file is missing"))?;
        let mut payload = match parse_by_extension(&meta_path, meta_text)? {
            JsonValue::Object(map) => map,
            JsonValue::Null => Map::new(),
            _ => return Err(incomplete(&meta_path, "script metadata is not a mapping")),
        };

        let lock_target = payload
            .get("lock")
            .and_then(JsonValue::as_str)
            .and_then(inline_target)
            .map(str::to_owned);
        if let Some(target) = lock_target {
            match scope.local.get(&target) {
                Some(lock) => payload.insert("lock".into(), JsonValue::String(lock.clone())),
                None => payload.remove("lock"),
            };
        }
        payload.insert("path".into(), JsonValue::String(base.to_string()));
        payload.insert("content".into(), JsonValue::String(content.clone()));
        payload.insert("language".into(), JsonValue::String(language.to_string()));

        let upsert = Upsert {
            kind: ArtifactKind::Script,
            path: base.to_string(),
            payload: JsonValue::Object(payload),
        };
        scope.service.upsert(scope.workspace, &upsert).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Flows
// ---------------------------------------------------------------------------

/// Owns every file under a `<name>.flow/` directory.
#[derive(Debug, Default)]
pub struct FlowHandler;

fn flow_dir(path: &str) -> Option<&str> {
    let idx = path.find(".flow/")?;
    Some(&path[..idx + ".flow".len()])
}

#[async_trait]
impl ArtifactHandler for FlowHandler {
    fn claims(&self, path: &str) -> bool {
        flow_dir(path).is_some()
    }

    async fn handle(
        &self,
        scope: &PushScope<'_>,
        change: &Change,
        synced: &mut HashSet<String>,
    ) -> Result<(), SyncError> {
        let path = change.path();
        let Some(dir) = flow_dir(path) else {
            return Ok(());
        };
        if !synced.insert(dir.to_string()) {
            debug!(%dir, "flow already pushed in this run");
            return Ok(());
        }
        let remote_path = dir.strip_suffix(".flow").unwrap_or(dir);

        let files = scope.files_under(&format!("{dir}/"));
        let document_name = format!("flow.{}", scope.format.extension());
        let Some(document) = files.get(&document_name) else {
            if matches!(change, Change::Deleted { .. }) {
                return scope.delete(ArtifactKind::Flow, remote_path).await;
            }
            return Err(incomplete(path, "flow document is missing"));
        };

        let flow = recombine_flow(document, scope.format, &files).map_err(|e| flow_err(dir, e))?;
        let mut payload = serde_json::to_value(&flow).map_err(|e| flow_err(dir, e.into()))?;
        if let Some(map) = payload.as_object_mut() {
            map.insert("path".into(), JsonValue::String(remote_path.to_string()));
        }

        let upsert = Upsert {
            kind: ArtifactKind::Flow,
            path: remote_path.to_string(),
            payload,
        };
        scope.service.upsert(scope.workspace, &upsert).await?;
        Ok(())
    }
}

/// Handlers consulted, in order, before the generic push path.
pub fn default_handlers() -> Vec<Box<dyn ArtifactHandler>> {
    vec![Box::new(FlowHandler), Box::new(ScriptHandler)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_claims() {
        let handler = ScriptHandler;
        assert!(handler.claims("f/a/job.py"));
        assert!(handler.claims("f/a/job.script.yaml"));
        assert!(handler.claims("f/a/job.script.lock"));
        assert!(!handler.claims("f/a/x.flow/a.inline_script.py"));
        assert!(!handler.claims("f/a/db.resource.yaml"));
    }

    #[test]
    fn script_keys() {
        assert_eq!(script_key("f/a/job.pg.sql"), Some("f/a/job"));
        assert_eq!(script_key("f/a/job.script.lock"), Some("f/a/job"));
        assert_eq!(script_key("f/a/job.script.json"), Some("f/a/job"));
    }

    #[test]
    fn flow_dirs() {
        assert_eq!(flow_dir("f/a/x.flow/flow.yaml"), Some("f/a/x.flow"));
        assert_eq!(flow_dir("f/a/x.flow/a.inline_script.ts"), Some("f/a/x.flow"));
        assert_eq!(flow_dir("f/a/x.py"), None);
    }
}
