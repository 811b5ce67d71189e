//! Script metadata helpers: lockfile extraction and list-to-string locks.

use serde_json::Value;

use crate::expand::INLINE_PREFIX;

/// Join a list-typed `lock` field into one newline-separated string.
///
/// Older remotes (and hand-edited files) represent the lock as a list of
/// lines. Returns `true` if the value was rewritten.
pub fn join_lock_lines(meta: &mut Value) -> bool {
    let Some(lock) = meta.get_mut("lock") else {
        return false;
    };
    let Some(lines) = lock.as_array() else {
        return false;
    };
    let joined = lines
        .iter()
        .map(|line| match line {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n");
    *lock = Value::String(joined);
    true
}

/// Move a non-empty string `lock` out of script metadata, leaving an
/// `!inline <lock_path>` reference behind.
///
/// Scripts that belong to a codebase bundle keep their lock in place.
pub fn extract_script_lock(meta: &mut Value, lock_path: &str) -> Option<String> {
    let obj = meta.as_object_mut()?;
    if obj.contains_key("codebase") {
        return None;
    }
    let lock = obj.get("lock")?.as_str()?;
    if lock.is_empty() || lock.starts_with(INLINE_PREFIX) {
        return None;
    }
    let lock = lock.to_string();
    obj.insert(
        "lock".to_string(),
        Value::String(format!("{INLINE_PREFIX}{lock_path}")),
    );
    Some(lock)
}

/// Target of an `!inline <path>` reference, if `value` is one.
pub fn inline_target(value: &str) -> Option<&str> {
    value.strip_prefix(INLINE_PREFIX).map(str::trim)
}
