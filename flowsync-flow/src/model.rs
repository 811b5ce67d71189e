//! Flow document model.
//!
//! Only the parts of the document the expansion needs are typed: the module
//! graph and the inline script body/lock. Every other field rides along in a
//! flattened `extra` map so that a parse → serialize cycle loses nothing.
//!
//! Module values with an unknown `type` (script references, identity steps,
//! ...) are kept verbatim as [`ModuleValue::Opaque`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Top-level flow document as delivered in the remote archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenFlow {
    pub value: FlowValue,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowValue {
    #[serde(default)]
    pub modules: Vec<FlowModule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_module: Option<Box<FlowModule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preprocessor_module: Option<Box<FlowModule>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowModule {
    pub value: ModuleValue,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FlowModule {
    pub fn summary(&self) -> Option<&str> {
        self.extra.get("summary").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModuleValue {
    Known(ModuleKind),
    Opaque(Map<String, Value>),
}

/// The module variants that can contain inline script bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ModuleKind {
    RawScript(RawScript),
    ForLoopFlow(LoopBody),
    WhileLoopFlow(LoopBody),
    BranchAll(BranchAll),
    BranchOne(BranchOne),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawScript {
    pub content: String,
    pub language: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawScript {
    pub fn lock(&self) -> Option<&str> {
        self.extra.get("lock").and_then(Value::as_str)
    }

    pub fn set_lock(&mut self, lock: String) {
        self.extra.insert("lock".to_string(), Value::String(lock));
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopBody {
    #[serde(default)]
    pub modules: Vec<FlowModule>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    #[serde(default)]
    pub modules: Vec<FlowModule>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchAll {
    #[serde(default)]
    pub branches: Vec<Branch>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchOne {
    #[serde(default)]
    pub branches: Vec<Branch>,
    #[serde(default)]
    pub default: Vec<FlowModule>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Visit every inline script in document order: main modules (depth-first,
/// branch bodies before a first-match default), then the failure module, then
/// the preprocessor module.
///
/// The callback receives the owning module's summary.
pub fn visit_raw_scripts<E, F>(flow: &mut OpenFlow, f: &mut F) -> Result<(), E>
where
    F: FnMut(Option<&str>, &mut RawScript) -> Result<(), E>,
{
    visit_modules(&mut flow.value.modules, f)?;
    if let Some(module) = flow.value.failure_module.as_deref_mut() {
        visit_module(module, f)?;
    }
    if let Some(module) = flow.value.preprocessor_module.as_deref_mut() {
        visit_module(module, f)?;
    }
    Ok(())
}

fn visit_modules<E, F>(modules: &mut [FlowModule], f: &mut F) -> Result<(), E>
where
    F: FnMut(Option<&str>, &mut RawScript) -> Result<(), E>,
{
    for module in modules {
        visit_module(module, f)?;
    }
    Ok(())
}

fn visit_module<E, F>(module: &mut FlowModule, f: &mut F) -> Result<(), E>
where
    F: FnMut(Option<&str>, &mut RawScript) -> Result<(), E>,
{
    let summary = module.extra.get("summary").and_then(Value::as_str);
    match &mut module.value {
        ModuleValue::Known(ModuleKind::RawScript(script)) => f(summary, script),
        ModuleValue::Known(ModuleKind::ForLoopFlow(body))
        | ModuleValue::Known(ModuleKind::WhileLoopFlow(body)) => visit_modules(&mut body.modules, f),
        ModuleValue::Known(ModuleKind::BranchAll(all)) => {
            for branch in &mut all.branches {
                visit_modules(&mut branch.modules, f)?;
            }
            Ok(())
        }
        ModuleValue::Known(ModuleKind::BranchOne(one)) => {
            for branch in &mut one.branches {
                visit_modules(&mut branch.modules, f)?;
            }
            visit_modules(&mut one.default, f)
        }
        ModuleValue::Opaque(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_module_types_survive_roundtrip() {
        let raw = json!({
            "summary": "s",
            "value": {
                "modules": [
                    {"id": "a", "value": {"type": "script", "path": "f/x/y", "input_transforms": {}}},
                    {"id": "b", "value": {"type": "identity"}}
                ],
                "same_worker": false
            },
            "schema": {"type": "object"}
        });
        let flow: OpenFlow = serde_json::from_value(raw.clone()).unwrap();
        assert!(matches!(flow.value.modules[0].value, ModuleValue::Opaque(_)));
        assert_eq!(serde_json::to_value(&flow).unwrap(), raw);
    }

    #[test]
    fn known_module_types_survive_roundtrip() {
        let raw = json!({
            "value": {
                "modules": [{
                    "id": "loop",
                    "value": {
                        "type": "forloopflow",
                        "iterator": {"type": "javascript", "expr": "[1,2]"},
                        "modules": [{
                            "id": "inner",
                            "summary": "Inner",
                            "value": {"type": "rawscript", "content": "x", "language": "bun", "input_transforms": {}}
                        }]
                    }
                }]
            }
        });
        let flow: OpenFlow = serde_json::from_value(raw.clone()).unwrap();
        assert!(matches!(
            flow.value.modules[0].value,
            ModuleValue::Known(ModuleKind::ForLoopFlow(_))
        ));
        assert_eq!(serde_json::to_value(&flow).unwrap(), raw);
    }

    #[test]
    fn visits_every_container_in_order() {
        let raw = json!({
            "value": {
                "modules": [
                    {"id": "a", "value": {"type": "rawscript", "content": "1", "language": "bun"}},
                    {"id": "b", "value": {"type": "branchone",
                        "branches": [{"expr": "true", "modules": [
                            {"id": "c", "value": {"type": "rawscript", "content": "2", "language": "bun"}}
                        ]}],
                        "default": [
                            {"id": "d", "value": {"type": "rawscript", "content": "3", "language": "bun"}}
                        ]}},
                    {"id": "e", "value": {"type": "branchall", "branches": [{"modules": [
                        {"id": "f", "value": {"type": "whileloopflow", "modules": [
                            {"id": "g", "value": {"type": "rawscript", "content": "4", "language": "bun"}}
                        ]}}
                    ]}]}}
                ],
                "failure_module": {"id": "failure", "value": {"type": "rawscript", "content": "5", "language": "bun"}}
            }
        });
        let mut flow: OpenFlow = serde_json::from_value(raw).unwrap();
        let mut seen = Vec::new();
        visit_raw_scripts::<(), _>(&mut flow, &mut |_, script| {
            seen.push(script.content.clone());
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, vec!["1", "2", "3", "4", "5"]);
    }
}
