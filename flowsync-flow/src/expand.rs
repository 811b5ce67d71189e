//! Flow expansion: inline script bodies out to files, and back again.
//!
//! Expansion is deterministic: the same document always yields the same file
//! names, contents and metadata text, so repeated pulls diff empty.

use std::collections::{HashMap, HashSet};
use std::convert::Infallible;

use flowsync_core::{DefaultTs, StructuredFormat};

use crate::error::FlowError;
use crate::format::{parse_structured, to_structured_text};
use crate::language::extension_for;
use crate::model::{visit_raw_scripts, OpenFlow};
use crate::script::inline_target;

/// Prefix of a back-reference from a flow document to an extracted file.
pub const INLINE_PREFIX: &str = "!inline ";

/// An extracted inline body, addressed relative to the flow directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineScript {
    pub path: String,
    pub content: String,
}

/// Hands out unique, readable file names for the inline scripts of one flow.
///
/// Scoped to a single expansion; never shared between flows.
#[derive(Debug)]
pub struct PathAssigner {
    default_ts: DefaultTs,
    counter: usize,
    seen: HashSet<String>,
}

impl PathAssigner {
    pub fn new(default_ts: DefaultTs) -> Self {
        Self {
            default_ts,
            counter: 0,
            seen: HashSet::new(),
        }
    }

    /// Returns `(base, extension)`; `base` ends with `.inline_script.` so the
    /// body lives at `base + extension` and its lock at `base + "lock"`.
    pub fn assign(&mut self, summary: Option<&str>, language: &str) -> (String, &'static str) {
        let from_summary = summary
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.to_lowercase().replace([' ', '/'], "_"));

        let name = match from_summary {
            Some(name) => self.free_suffixed(name),
            None => loop {
                let candidate = format!("inline_script_{}", self.counter);
                if !self.seen.contains(&candidate) {
                    break candidate;
                }
                self.counter += 1;
            },
        };
        self.seen.insert(name.clone());

        (
            format!("{name}.inline_script."),
            extension_for(language, self.default_ts),
        )
    }

    /// `name`, or the first of `name_1`, `name_2`, ... not yet handed out.
    fn free_suffixed(&self, name: String) -> String {
        if !self.seen.contains(&name) {
            return name;
        }
        (1..)
            .map(|n| format!("{name}_{n}"))
            .find(|candidate| !self.seen.contains(candidate))
            .unwrap_or(name)
    }
}

/// Replace every inline body (and non-empty lock) in `flow` with an
/// `!inline` reference and return the extracted files.
pub fn extract_inline_scripts(flow: &mut OpenFlow, default_ts: DefaultTs) -> Vec<InlineScript> {
    let mut assigner = PathAssigner::new(default_ts);
    let mut extracted = Vec::new();

    let Ok(()) = visit_raw_scripts::<Infallible, _>(flow, &mut |summary, script| {
        let (base, ext) = assigner.assign(summary, &script.language);
        let path = format!("{base}{ext}");
        let body = std::mem::replace(&mut script.content, format!("{INLINE_PREFIX}{path}"));
        extracted.push(InlineScript {
            path,
            content: body,
        });

        let lock = script.lock().filter(|l| !l.is_empty()).map(str::to_owned);
        if let Some(lock) = lock {
            let lock_path = format!("{base}lock");
            script.set_lock(format!("{INLINE_PREFIX}{lock_path}"));
            extracted.push(InlineScript {
                path: lock_path,
                content: lock,
            });
        }
        Ok(())
    });

    extracted
}

/// Result of expanding one flow document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedFlow {
    pub scripts: Vec<InlineScript>,
    /// `flow.yaml` or `flow.json`.
    pub document_name: String,
    /// De-inlined document in the requested family.
    pub document: String,
}

/// Expand the raw JSON flow document found in the remote archive.
pub fn expand_flow(
    raw_json: &str,
    format: StructuredFormat,
    default_ts: DefaultTs,
) -> Result<ExpandedFlow, FlowError> {
    let mut flow: OpenFlow = serde_json::from_str(raw_json)?;
    let scripts = extract_inline_scripts(&mut flow, default_ts);
    let value = serde_json::to_value(&flow)?;
    Ok(ExpandedFlow {
        scripts,
        document_name: format!("flow.{}", format.extension()),
        document: to_structured_text(&value, format)?,
    })
}

/// Re-inline a flow directory: parse its `flow.<format>` document and swap
/// every `!inline` reference for the referenced file's content.
///
/// `files` maps names relative to the flow directory to their content.
pub fn recombine_flow(
    document: &str,
    format: StructuredFormat,
    files: &HashMap<String, String>,
) -> Result<OpenFlow, FlowError> {
    let value = parse_structured(document, format)?;
    let mut flow: OpenFlow = serde_json::from_value(value)?;

    let resolve = |reference: &str| -> Result<Option<String>, FlowError> {
        let Some(name) = inline_target(reference) else {
            return Ok(None);
        };
        files
            .get(name)
            .cloned()
            .map(Some)
            .ok_or_else(|| FlowError::MissingInline {
                name: name.to_string(),
            })
    };

    visit_raw_scripts(&mut flow, &mut |_, script| {
        if let Some(body) = resolve(&script.content)? {
            script.content = body;
        }
        let lock = script.lock().map(|l| resolve(l)).transpose()?.flatten();
        if let Some(lock) = lock {
            script.set_lock(lock);
        }
        Ok::<(), FlowError>(())
    })?;

    Ok(flow)
}
