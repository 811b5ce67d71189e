//! Snapshot differ with format-aware equality, plus unified diff rendering.
//!
//! Output order is the iteration order of [`Snapshot`] (a `BTreeMap`): first
//! every added or edited path of the new side in ascending path order, then
//! every deleted path of the old side in ascending path order.

use serde_json::Value as JsonValue;
use similar::TextDiff;

use flowsync_core::{Change, Snapshot};
use flowsync_flow::script::join_lock_lines;

/// Script metadata is regenerated on every pull; its disappearance from one
/// side is never reported as a deletion.
const SUPPRESSED_DELETIONS: &[&str] = &[".script.json", ".script.yaml"];

/// Compare `new` against `old`.
pub fn compute_changes(new: &Snapshot, old: &Snapshot) -> Vec<Change> {
    let mut changes = Vec::new();

    for (path, after) in new {
        match old.get(path) {
            None => changes.push(Change::Added {
                path: path.clone(),
                content: after.clone(),
            }),
            Some(before) if before != after && !semantically_equal(path, before, after) => {
                changes.push(Change::Edited {
                    path: path.clone(),
                    before: before.clone(),
                    after: after.clone(),
                })
            }
            Some(_) => {}
        }
    }

    for path in old.keys() {
        if new.contains_key(path) || SUPPRESSED_DELETIONS.iter().any(|s| path.ends_with(s)) {
            continue;
        }
        changes.push(Change::Deleted { path: path.clone() });
    }

    changes
}

/// Structured files compare by parsed value; everything else is never equal
/// once the text differs.
fn semantically_equal(path: &str, a: &str, b: &str) -> bool {
    match (parse(path, a), parse(path, b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn parse(path: &str, text: &str) -> Option<JsonValue> {
    let mut value: JsonValue = if path.ends_with(".json") {
        serde_json::from_str(text).ok()?
    } else if path.ends_with(".yaml") {
        serde_yaml::from_str(text).ok()?
    } else {
        return None;
    };
    if path.ends_with(".script.json") || path.ends_with(".script.yaml") {
        join_lock_lines(&mut value);
    }
    Some(value)
}

/// Unified diff of `before` → `after`, headed `a/<path>` / `b/<path>`.
pub fn render_unified(path: &str, before: &str, after: &str) -> String {
    let old_header = format!("a/{path}");
    let new_header = format!("b/{path}");
    TextDiff::from_lines(before, after)
        .unified_diff()
        .header(&old_header, &new_header)
        .context_radius(3)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(entries: &[(&str, &str)]) -> Snapshot {
        entries
            .iter()
            .map(|(p, c)| (p.to_string(), c.to_string()))
            .collect()
    }

    #[test]
    fn added_edited_then_deleted_in_path_order() {
        let new = snapshot(&[("f/b.py", "2"), ("f/a.py", "1"), ("f/c.py", "new")]);
        let old = snapshot(&[("f/c.py", "old"), ("f/z.py", "z"), ("f/d.py", "d")]);
        let changes = compute_changes(&new, &old);
        let paths: Vec<(&str, &str)> = changes.iter().map(|c| (c.label(), c.path())).collect();
        assert_eq!(
            paths,
            vec![
                ("added", "f/a.py"),
                ("added", "f/b.py"),
                ("edited", "f/c.py"),
                ("deleted", "f/d.py"),
                ("deleted", "f/z.py"),
            ]
        );
    }

    #[test]
    fn diffs_mirror_each_other() {
        let a = snapshot(&[("f/a.py", "1"), ("f/b.py", "same"), ("f/c.py", "a-side")]);
        let b = snapshot(&[("f/b.py", "same"), ("f/c.py", "b-side"), ("f/d.py", "4")]);

        let forward = compute_changes(&a, &b);
        let backward = compute_changes(&b, &a);
        let mirrored: Vec<Change> = backward
            .into_iter()
            .map(|change| match change {
                Change::Added { path, .. } => Change::Deleted { path },
                Change::Deleted { path } => Change::Added {
                    content: a[&path].clone(),
                    path,
                },
                Change::Edited { path, before, after } => Change::Edited {
                    path,
                    before: after,
                    after: before,
                },
            })
            .collect();

        let mut forward_sorted = forward.clone();
        let mut mirrored_sorted = mirrored;
        forward_sorted.sort_by(|x, y| x.path().cmp(y.path()));
        mirrored_sorted.sort_by(|x, y| x.path().cmp(y.path()));
        assert_eq!(forward_sorted, mirrored_sorted);
        assert!(!forward.iter().any(|c| c.path() == "f/b.py"));
    }

    #[test]
    fn yaml_key_order_and_whitespace_are_absorbed() {
        let new = snapshot(&[("f/a/x.resource.yaml", "b: 2\na: 1\n")]);
        let old = snapshot(&[("f/a/x.resource.yaml", "a:   1\nb: 2")]);
        assert!(compute_changes(&new, &old).is_empty());
    }

    #[test]
    fn list_locks_equal_joined_string_for_script_metadata_only() {
        let new = snapshot(&[("f/a/x.script.yaml", "lock: \"a\\nb\"\n")]);
        let old = snapshot(&[("f/a/x.script.yaml", "lock:\n- a\n- b\n")]);
        assert!(compute_changes(&new, &old).is_empty());

        let new = snapshot(&[("f/a/x.resource.yaml", "lock: \"a\\nb\"\n")]);
        let old = snapshot(&[("f/a/x.resource.yaml", "lock:\n- a\n- b\n")]);
        assert_eq!(compute_changes(&new, &old).len(), 1);
    }

    #[test]
    fn script_metadata_deletions_are_suppressed() {
        let old = snapshot(&[("f/a/x.script.yaml", "summary: s"), ("f/a/x.py", "1")]);
        let changes = compute_changes(&Snapshot::new(), &old);
        assert_eq!(changes, vec![Change::Deleted { path: "f/a/x.py".into() }]);
    }

    #[test]
    fn unified_diff_has_headers() {
        let text = render_unified("f/a.py", "a\nb\n", "a\nc\n");
        assert!(text.contains("--- a/f/a.py"));
        assert!(text.contains("+++ b/f/a.py"));
        assert!(text.contains("-b"));
        assert!(text.contains("+c"));
    }
}
