//! Remote workspace archive as a virtual tree.
//!
//! The zip is kept in memory and indexed once; entries are only decoded when
//! a traversal reaches them. While presenting entries the tree applies the
//! local file layout:
//!
//! - `.json` entries appear as `.yaml` when the run uses the YAML family, with
//!   content re-serialized in priority key order,
//! - script metadata gets its lockfile split into a `<base>.script.lock` leaf,
//! - `<flow>.flow/flow.json` becomes a directory of inline script files plus
//!   the de-inlined `flow.<ext>` document.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde_json::Value as JsonValue;
use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

use flowsync_core::{DefaultTs, Revision, StructuredFormat};
use flowsync_flow::script::{extract_script_lock, join_lock_lines};
use flowsync_flow::{expand_flow, to_structured_text, FlowError};

use crate::error::{flow_err, io_err, SyncError};
use crate::tree::{join_path, not_a_leaf, BoxNode, SyntheticLeaf, TreeNode};

/// First remote revision that serializes script locks as a single string.
pub const LOCK_AS_STRING_SINCE: Revision = Revision::new(1, 200, 0);

const FLOW_DOCUMENT: &str = ".flow/flow.json";
const SCRIPT_METADATA: &str = ".script.json";

/// How archive entries are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArchiveOptions {
    pub format: StructuredFormat,
    pub default_ts: DefaultTs,
    /// Join list-typed script locks into one string before extraction.
    pub legacy_locks: bool,
}

impl ArchiveOptions {
    /// Options for a remote reporting `version`. Unknown versions count as current.
    pub fn for_remote(format: StructuredFormat, default_ts: DefaultTs, version: Option<Revision>) -> Self {
        Self {
            format,
            default_ts,
            legacy_locks: version.is_some_and(|v| v < LOCK_AS_STRING_SINCE),
        }
    }
}

// ---------------------------------------------------------------------------
// Index
// ---------------------------------------------------------------------------

struct Inner {
    zip: Mutex<ZipArchive<Cursor<Vec<u8>>>>,
    /// Normalized file path → entry name inside the zip.
    files: BTreeMap<String, String>,
    /// Directory path → `(child path, is_dir)`; includes implied directories.
    dirs: BTreeMap<String, BTreeSet<(String, bool)>>,
    options: ArchiveOptions,
}

/// An opened remote archive.
#[derive(Clone)]
pub struct RemoteArchive {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for RemoteArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteArchive")
            .field("files", &self.inner.files.len())
            .field("options", &self.inner.options)
            .finish()
    }
}

fn parent_of(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(parent, _)| parent)
}

fn register_dir(dirs: &mut BTreeMap<String, BTreeSet<(String, bool)>>, dir: &str) {
    let mut current = dir.to_string();
    while !current.is_empty() {
        let parent = parent_of(&current).to_string();
        dirs.entry(current.clone()).or_default();
        dirs.entry(parent.clone())
            .or_default()
            .insert((current, true));
        current = parent;
    }
    dirs.entry(String::new()).or_default();
}

impl RemoteArchive {
    /// Open and index an in-memory zip.
    pub fn open(bytes: Vec<u8>, options: ArchiveOptions) -> Result<Self, SyncError> {
        let zip = ZipArchive::new(Cursor::new(bytes))?;

        let mut files = BTreeMap::new();
        let mut dirs: BTreeMap<String, BTreeSet<(String, bool)>> = BTreeMap::new();
        dirs.insert(String::new(), BTreeSet::new());

        for name in zip.file_names() {
            let normalized = name.trim_start_matches("./").trim_start_matches('/');
            if normalized.is_empty() {
                continue;
            }
            if let Some(dir) = normalized.strip_suffix('/') {
                register_dir(&mut dirs, dir);
                continue;
            }
            let parent = parent_of(normalized);
            register_dir(&mut dirs, parent);
            dirs.entry(parent.to_string())
                .or_default()
                .insert((normalized.to_string(), false));
            files.insert(normalized.to_string(), name.to_string());
        }
        debug!(entries = files.len(), "indexed remote archive");

        Ok(Self {
            inner: Arc::new(Inner {
                zip: Mutex::new(zip),
                files,
                dirs,
                options,
            }),
        })
    }

    /// Root directory node.
    pub fn root(&self) -> BoxNode {
        Box::new(ArchiveDir {
            archive: Arc::clone(&self.inner),
            path: String::new(),
        })
    }
}

impl Inner {
    fn read_entry(&self, path: &str) -> Result<String, SyncError> {
        let name = self.files.get(path).ok_or(ZipError::FileNotFound)?;
        let mut zip = self.zip.lock().unwrap_or_else(PoisonError::into_inner);
        let mut file = zip.by_name(name)?;
        let mut text = String::new();
        file.read_to_string(&mut text).map_err(|e| io_err(path, e))?;
        Ok(text)
    }

    /// Path an entry is presented at in the active format family.
    fn presented(&self, path: &str) -> String {
        match (self.options.format, path.strip_suffix(".json")) {
            (StructuredFormat::Yaml, Some(stem)) => format!("{stem}.yaml"),
            _ => path.to_string(),
        }
    }

    fn reserialize(&self, path: &str, value: &JsonValue) -> Result<String, SyncError> {
        to_structured_text(value, self.options.format).map_err(|e| flow_err(path, e))
    }

    fn parse_json(path: &str, raw: &str) -> Result<JsonValue, SyncError> {
        serde_json::from_str(raw).map_err(|e| flow_err(path, FlowError::from(e)))
    }

    fn script_metadata(&self, path: &str, base: &str) -> Result<Vec<BoxNode>, SyncError> {
        let mut meta = Self::parse_json(path, &self.read_entry(path)?)?;
        if self.options.legacy_locks {
            join_lock_lines(&mut meta);
        }
        let lock_path = format!("{base}.script.lock");
        let lock = extract_script_lock(&mut meta, &lock_path);

        let mut nodes = vec![SyntheticLeaf::new(self.presented(path), self.reserialize(path, &meta)?).boxed()];
        if let Some(lock) = lock {
            nodes.push(SyntheticLeaf::new(lock_path, lock).boxed());
        }
        Ok(nodes)
    }
}

/// Nodes standing in for one archive child.
fn nodes_for(archive: &Arc<Inner>, path: String, is_dir: bool) -> Result<Vec<BoxNode>, SyncError> {
    if is_dir {
        return Ok(vec![Box::new(ArchiveDir {
            archive: Arc::clone(archive),
            path,
        }) as BoxNode]);
    }
    if path.ends_with(FLOW_DOCUMENT) {
        return Ok(vec![Box::new(FlowDocument {
            archive: Arc::clone(archive),
            path,
        }) as BoxNode]);
    }
    if let Some(base) = path.strip_suffix(SCRIPT_METADATA) {
        return archive.script_metadata(&path, base);
    }
    Ok(vec![Box::new(ArchiveLeaf {
        archive: Arc::clone(archive),
        presented: archive.presented(&path),
        entry: path,
    }) as BoxNode])
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

struct ArchiveDir {
    archive: Arc<Inner>,
    path: String,
}

#[async_trait]
impl TreeNode for ArchiveDir {
    fn path(&self) -> &str {
        &self.path
    }

    fn is_directory(&self) -> bool {
        true
    }

    fn children(&self) -> BoxStream<'_, Result<BoxNode, SyncError>> {
        let children: Vec<(String, bool)> = self
            .archive
            .dirs
            .get(&self.path)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        let archive = Arc::clone(&self.archive);

        stream::iter(children)
            .map(move |(path, is_dir)| nodes_for(&archive, path, is_dir))
            .map_ok(|nodes| stream::iter(nodes.into_iter().map(Ok::<_, SyncError>)))
            .try_flatten()
            .boxed()
    }

    async fn content_text(&self) -> Result<String, SyncError> {
        Err(not_a_leaf(&self.path))
    }
}

/// A plain archive file, decoded on first read.
struct ArchiveLeaf {
    archive: Arc<Inner>,
    entry: String,
    presented: String,
}

#[async_trait]
impl TreeNode for ArchiveLeaf {
    fn path(&self) -> &str {
        &self.presented
    }

    fn is_directory(&self) -> bool {
        false
    }

    async fn content_text(&self) -> Result<String, SyncError> {
        let raw = self.archive.read_entry(&self.entry)?;
        if !self.entry.ends_with(".json") {
            return Ok(raw);
        }
        let value = Inner::parse_json(&self.entry, &raw)?;
        self.archive.reserialize(&self.entry, &value)
    }
}

/// `<flow>.flow/flow.json`, presented as a directory of expanded files.
struct FlowDocument {
    archive: Arc<Inner>,
    path: String,
}

impl FlowDocument {
    fn expand(&self) -> Result<Vec<BoxNode>, SyncError> {
        let raw = self.archive.read_entry(&self.path)?;
        let options = self.archive.options;
        let expanded =
            expand_flow(&raw, options.format, options.default_ts).map_err(|e| flow_err(&self.path, e))?;

        let dir = parent_of(&self.path);
        let mut nodes: Vec<BoxNode> = expanded
            .scripts
            .into_iter()
            .map(|script| SyntheticLeaf::new(join_path(dir, &script.path), script.content).boxed())
            .collect();
        nodes.push(SyntheticLeaf::new(join_path(dir, &expanded.document_name), expanded.document).boxed());
        Ok(nodes)
    }
}

#[async_trait]
impl TreeNode for FlowDocument {
    fn path(&self) -> &str {
        &self.path
    }

    fn is_directory(&self) -> bool {
        true
    }

    fn children(&self) -> BoxStream<'_, Result<BoxNode, SyncError>> {
        stream::once(async move { self.expand() })
            .map_ok(|nodes| stream::iter(nodes.into_iter().map(Ok::<_, SyncError>)))
            .try_flatten()
            .boxed()
    }

    async fn content_text(&self) -> Result<String, SyncError> {
        Err(not_a_leaf(&self.path))
    }
}
