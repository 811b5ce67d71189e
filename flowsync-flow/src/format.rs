//! Structured-text encoding shared by every artifact.
//!
//! YAML output sorts mapping keys by a priority remap instead of
//! alphabetically: identifiers and types first, bodies and locks last, so that
//! files keep the same readable shape across round-trips. Multi-line strings
//! (lockfiles in particular) come out as literal blocks.
//!
//! JSON output is pretty-printed with `serde_json`'s (sorted) map order.

use std::cmp::Ordering;

use serde_json::Value as JsonValue;
use serde_yaml::{Mapping, Value as YamlValue};

use flowsync_core::StructuredFormat;

use crate::error::FlowError;

/// Sort key for a mapping key.
fn priority_key(name: &str) -> &str {
    match name {
        "id" => "aa",
        "type" => "ab",
        "summary" => "ad",
        "name" => "ae",
        "display_name" => "af",
        "description" => "ag",
        "value" => "ah",
        "content" => "ai",
        "modules" => "aj",
        "failure_module" => "ak",
        "input_transforms" => "al",
        "lock" => "az",
        "locks" => "azz",
        other => other,
    }
}

fn compare_keys(a: &str, b: &str) -> Ordering {
    priority_key(a)
        .cmp(priority_key(b))
        .then_with(|| a.cmp(b))
}

fn to_ordered_yaml(value: &JsonValue) -> YamlValue {
    match value {
        JsonValue::Null => YamlValue::Null,
        JsonValue::Bool(b) => YamlValue::Bool(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                YamlValue::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                YamlValue::Number(u.into())
            } else {
                YamlValue::Number(n.as_f64().unwrap_or_default().into())
            }
        }
        JsonValue::String(s) => YamlValue::String(s.clone()),
        JsonValue::Array(items) => YamlValue::Sequence(items.iter().map(to_ordered_yaml).collect()),
        JsonValue::Object(map) => {
            let mut entries: Vec<(&String, &JsonValue)> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| compare_keys(a, b));
            let mut mapping = Mapping::with_capacity(entries.len());
            for (key, value) in entries {
                mapping.insert(YamlValue::String(key.clone()), to_ordered_yaml(value));
            }
            YamlValue::Mapping(mapping)
        }
    }
}

/// Serialize `value` in the given structured family.
pub fn to_structured_text(value: &JsonValue, format: StructuredFormat) -> Result<String, FlowError> {
    match format {
        StructuredFormat::Yaml => Ok(serde_yaml::to_string(&to_ordered_yaml(value))?),
        StructuredFormat::Json => {
            let mut text = serde_json::to_string_pretty(value)?;
            text.push('\n');
            Ok(text)
        }
    }
}

/// Parse structured text of either family into a JSON value tree.
pub fn parse_structured(text: &str, format: StructuredFormat) -> Result<JsonValue, FlowError> {
    match format {
        StructuredFormat::Yaml => Ok(serde_yaml::from_str(text)?),
        StructuredFormat::Json => Ok(serde_json::from_str(text)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn yaml_keys_follow_priority_order() {
        let value = json!({
            "lock": "a",
            "content": "b",
            "zeta": 1,
            "summary": "s",
            "id": "x",
            "alpha": true,
            "type": "rawscript"
        });
        let text = to_structured_text(&value, StructuredFormat::Yaml).unwrap();
        let keys: Vec<&str> = text
            .lines()
            .map(|l| l.split(':').next().unwrap())
            .collect();
        assert_eq!(
            keys,
            vec!["id", "type", "summary", "content", "alpha", "lock", "zeta"]
        );
    }

    #[test]
    fn multiline_lock_is_a_block_not_a_list() {
        let value = json!({"lock": "dep-a==1\ndep-b==2\n"});
        let text = to_structured_text(&value, StructuredFormat::Yaml).unwrap();
        assert!(text.starts_with("lock: |"), "got: {text}");
        assert!(!text.contains("- dep-a"));
        assert_eq!(parse_structured(&text, StructuredFormat::Yaml).unwrap(), value);
    }

    #[test]
    fn serialization_is_deterministic() {
        let value = json!({"b": [1, 2.5, null], "a": {"y": "1", "x": false}});
        for format in [StructuredFormat::Yaml, StructuredFormat::Json] {
            let first = to_structured_text(&value, format).unwrap();
            let second = to_structured_text(&value, format).unwrap();
            assert_eq!(first, second);
            assert_eq!(parse_structured(&first, format).unwrap(), value);
        }
    }
}
