//! # Specification Patch
//!
//! A partial update produced by one conversational turn. Patches arrive from
//! the extraction oracle as untrusted JSON; `SpecPatch::from_untrusted` is the
//! single trust boundary. Unknown keys and unusable shapes are dropped and
//! reported, never propagated.

use super::document::AgentSpec;
use super::schema;
use crate::error::SpecError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Names the user explicitly asked to delete
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Retraction {
    #[serde(default)]
    pub agents: Vec<String>,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
}

impl Retraction {
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty() && self.tools.is_empty() && self.constraints.is_empty()
    }
}

/// Candidate field updates for one turn
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    #[serde(default)]
    pub agents: Vec<AgentSpec>,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub communication: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topology: Option<String>,
    #[serde(default)]
    pub constraints: BTreeMap<String, Value>,
    #[serde(default)]
    pub retract: Retraction,
}

/// A validated patch plus everything that had to be thrown away
#[derive(Debug, Clone, Default)]
pub struct PatchValidation {
    pub patch: SpecPatch,
    pub rejected: Vec<SpecError>,
}

impl PatchValidation {
    /// Field paths that were discarded, for events and logs
    pub fn rejected_fields(&self) -> Vec<String> {
        self.rejected
            .iter()
            .filter_map(|e| match e {
                SpecError::InvalidPatchShape { field, .. } => Some(field.clone()),
                _ => None,
            })
            .collect()
    }
}

impl SpecPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Validate untrusted oracle output into a patch
    pub fn from_untrusted(value: &Value) -> PatchValidation {
        let mut validation = PatchValidation::default();

        let object = match value {
            Value::Object(object) => object,
            Value::Null => return validation,
            other => {
                reject(
                    &mut validation.rejected,
                    "updated_fields",
                    format!("expected an object, got {}", type_name(other)),
                );
                return validation;
            }
        };

        for (raw_key, raw_value) in object {
            let key = raw_key.trim().to_lowercase();
            if !schema::is_known_patch_key(&key) {
                reject(&mut validation.rejected, raw_key, "unknown field".to_string());
                continue;
            }
            if raw_value.is_null() {
                continue;
            }

            let patch = &mut validation.patch;
            let rejected = &mut validation.rejected;
            let result = match key.as_str() {
                schema::TASK => text_value(raw_value).map(|v| patch.task = v),
                schema::GOAL => text_value(raw_value).map(|v| patch.goal = v),
                schema::COMMUNICATION => text_value(raw_value).map(|v| patch.communication = v),
                schema::TOPOLOGY => text_value(raw_value).map(|v| patch.topology = v),
                schema::AGENTS => parse_agents(raw_value, rejected).map(|v| patch.agents = v),
                schema::TOOLS => name_list(raw_value).map(|v| patch.tools = v),
                schema::CONSTRAINTS => {
                    parse_constraints(raw_value, rejected).map(|v| patch.constraints = v)
                }
                schema::RETRACT => parse_retraction(raw_value).map(|v| patch.retract = v),
                _ => Err("unknown field".to_string()),
            };

            if let Err(reason) = result {
                reject(rejected, &key, reason);
            }
        }

        validation
    }
}

fn reject(rejected: &mut Vec<SpecError>, field: &str, reason: String) {
    tracing::warn!(field = %field, reason = %reason, "Discarding patch field");
    rejected.push(SpecError::InvalidPatchShape {
        field: field.to_string(),
        reason,
    });
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Scalar text; blank text becomes `None` (a no-op for the merge)
fn text_value(value: &Value) -> Result<Option<String>, String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(|i| i.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if parts.len() != items.len() {
                return Err("expected text or a list of text".to_string());
            }
            parts.join(", ")
        }
        other => return Err(format!("expected text, got {}", type_name(other))),
    };
    Ok(Some(text).filter(|t| !t.is_empty()))
}

/// A list of names: `["a", "b"]`, `[{"name": "a"}]`, or `"a, b"`
fn name_list(value: &Value) -> Result<Vec<String>, String> {
    let names: Vec<String> = match value {
        Value::String(s) => s.split(',').map(|p| p.trim().to_string()).collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Object(obj) => first_text(obj, &["name", "id"]),
                _ => None,
            })
            .collect(),
        other => return Err(format!("expected a list of names, got {}", type_name(other))),
    };
    Ok(names.into_iter().filter(|n| !n.is_empty()).collect())
}

fn first_text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .filter_map(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
}

fn optional_names(obj: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .filter(|v| !v.is_null())
        .filter_map(|v| name_list(v).ok())
        .flatten()
        .collect()
}

fn agent_from_object(obj: &Map<String, Value>, fallback_name: Option<&str>) -> Option<AgentSpec> {
    let name = first_text(obj, &["name", "role", "id"])
        .or_else(|| fallback_name.map(|n| n.trim().to_string()))
        .filter(|n| !n.is_empty())?;

    // "role" doubles as a description when the name came from elsewhere
    let description = first_text(obj, &["description", "purpose", "responsibility"]).or_else(|| {
        first_text(obj, &["role"]).filter(|role| role != &name)
    });

    Some(AgentSpec {
        name,
        description,
        capabilities: optional_names(obj, &["capabilities", "skills"]),
        tools: optional_names(obj, &["tools", "uses_tools"]),
        communicates_with: optional_names(
            obj,
            &["communicates_with", "partners", "talks_to", "reports_to"],
        ),
    })
}

fn parse_agents(value: &Value, rejected: &mut Vec<SpecError>) -> Result<Vec<AgentSpec>, String> {
    let mut agents = Vec::new();
    match value {
        Value::String(_) => {
            agents.extend(name_list(value)?.into_iter().map(AgentSpec::new));
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                let agent = match item {
                    Value::String(s) if !s.trim().is_empty() => Some(AgentSpec::new(s.trim())),
                    Value::Object(obj) => agent_from_object(obj, None),
                    _ => None,
                };
                match agent {
                    Some(agent) => agents.push(agent),
                    None => reject(
                        rejected,
                        &format!("agents[{}]", index),
                        "entry has no usable name".to_string(),
                    ),
                }
            }
        }
        // {"manager": "routes tickets", "billing": {...}}
        Value::Object(map) => {
            for (name, entry) in map {
                let agent = match entry {
                    Value::Null => Some(AgentSpec::new(name.trim())),
                    Value::String(desc) => {
                        let mut agent = AgentSpec::new(name.trim());
                        agent.description = Some(desc.trim().to_string()).filter(|d| !d.is_empty());
                        Some(agent)
                    }
                    Value::Object(obj) => agent_from_object(obj, Some(name.as_str())),
                    _ => None,
                };
                match agent.filter(|a| !a.name.is_empty()) {
                    Some(agent) => agents.push(agent),
                    None => reject(
                        rejected,
                        &format!("agents.{}", name),
                        "entry has no usable shape".to_string(),
                    ),
                }
            }
        }
        other => return Err(format!("expected a list of agents, got {}", type_name(other))),
    }
    Ok(agents)
}

fn parse_constraints(
    value: &Value,
    rejected: &mut Vec<SpecError>,
) -> Result<BTreeMap<String, Value>, String> {
    let mut constraints = BTreeMap::new();
    match value {
        Value::Object(map) => {
            for (name, entry) in map {
                let name = name.trim();
                if name.is_empty() {
                    reject(rejected, "constraints", "blank constraint name".to_string());
                    continue;
                }
                constraints.insert(name.to_string(), entry.clone());
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                match constraint_entry(item) {
                    Some((name, entry)) => {
                        constraints.insert(name, entry);
                    }
                    None => reject(
                        rejected,
                        &format!("constraints[{}]", index),
                        "entry has no usable name".to_string(),
                    ),
                }
            }
        }
        other => return Err(format!("expected a map of constraints, got {}", type_name(other))),
    }
    Ok(constraints)
}

/// `{"name": .., "value": ..}` or `"name: value"` or a bare flag
fn constraint_entry(item: &Value) -> Option<(String, Value)> {
    match item {
        Value::Object(obj) => {
            let name = first_text(obj, &["name", "key", "constraint"])?;
            let entry = ["value", "description", "limit"]
                .iter()
                .find_map(|k| obj.get(*k).cloned())
                .unwrap_or(Value::Bool(true));
            Some((name, entry))
        }
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            match s.split_once(':') {
                Some((name, entry)) if !name.trim().is_empty() => Some((
                    name.trim().to_string(),
                    Value::String(entry.trim().to_string()),
                )),
                _ => Some((s.to_string(), Value::Bool(true))),
            }
        }
        _ => None,
    }
}

fn parse_retraction(value: &Value) -> Result<Retraction, String> {
    let Value::Object(obj) = value else {
        return Err(format!("expected an object, got {}", type_name(value)));
    };
    Ok(Retraction {
        agents: optional_names(obj, &["agents"]),
        tools: optional_names(obj, &["tools"]),
        constraints: optional_names(obj, &["constraints"]),
    })
}
