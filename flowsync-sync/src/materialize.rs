//! Flatten a virtual tree into a [`Snapshot`].

use futures::TryStreamExt;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use flowsync_core::{Skips, Snapshot, StructuredFormat};
use flowsync_filter::PathFilter;
use flowsync_flow::parse_structured;

use crate::error::SyncError;
use crate::tree::BoxNode;

/// Extensions that can hold artifact content. Anything else is ignored.
const RECOGNIZED_EXTENSIONS: &[&str] = &[
    "json", "yaml", "go", "sh", "ts", "py", "sql", "gql", "ps1", "php", "js", "lock", "rs", "cs",
    "yml",
];

/// Per-run materialization settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaterializeOptions {
    pub format: StructuredFormat,
    pub skips: Skips,
}

/// Walk `root` depth-first and collect every in-scope leaf.
///
/// Exclusion is inherited: once a directory is excluded, nothing below it is
/// collected even if it would pass the filter on its own. A leaf that cannot
/// be read is logged and treated as absent.
pub async fn materialize(
    root: BoxNode,
    filter: &PathFilter,
    options: &MaterializeOptions,
) -> Result<Snapshot, SyncError> {
    let mut snapshot = Snapshot::new();
    let mut stack: Vec<(BoxNode, bool)> = vec![(root, false)];

    while let Some((node, parent_excluded)) = stack.pop() {
        let path = node.path().to_string();
        let excluded = parent_excluded || filter.is_excluded(&path, node.is_directory());

        if node.is_directory() {
            let children: Vec<BoxNode> = node.children().try_collect().await?;
            stack.extend(children.into_iter().map(|child| (child, excluded)));
            continue;
        }
        if excluded {
            debug!(%path, "excluded by filter");
            continue;
        }
        if !keeps_file(&path, options) {
            continue;
        }

        let content = match node.content_text().await {
            Ok(content) => content,
            Err(SyncError::Io { source, .. }) => {
                warn!(%path, error = %source, "cannot read file, skipping");
                continue;
            }
            Err(err) => return Err(err),
        };
        if options.skips.skip_secrets && is_variable(&path) && is_secret(&path, &content) {
            debug!(%path, "skipping secret variable");
            continue;
        }
        snapshot.insert(path, content);
    }

    Ok(snapshot)
}

fn extension(path: &str) -> Option<&str> {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    file_name.rsplit_once('.').map(|(_, ext)| ext)
}

fn is_variable(path: &str) -> bool {
    path.contains(".variable.")
}

/// Extension, format-family and content-class checks; no I/O.
fn keeps_file(path: &str, options: &MaterializeOptions) -> bool {
    let Some(ext) = extension(path) else {
        return false;
    };
    if !RECOGNIZED_EXTENSIONS.contains(&ext) || ext == options.format.inactive_extension() {
        return false;
    }
    let skips = &options.skips;
    if skips.skip_variables && is_variable(path) {
        return false;
    }
    if skips.skip_resources && path.contains(".resource.") {
        return false;
    }
    if !skips.include_schedules && path.contains(".schedule.") {
        return false;
    }
    true
}

/// Whether a variable payload is flagged secret. Unparseable payloads are kept.
fn is_secret(path: &str, content: &str) -> bool {
    let format = if path.ends_with(".json") {
        StructuredFormat::Json
    } else {
        StructuredFormat::Yaml
    };
    match parse_structured(content, format) {
        Ok(value) => value.get("is_secret").and_then(JsonValue::as_bool).unwrap_or(false),
        Err(err) => {
            warn!(%path, error = %err, "cannot parse variable, keeping it");
            false
        }
    }
}
