//! # Merge Engine
//!
//! Applies a validated `SpecPatch` to a `SpecDocument` and returns a new
//! document. The caller's document is never touched.
//!
//! ## Rules
//!
//! 1. **Retract**: names listed under `retract` are removed, unless the same
//!    patch re-declares them
//! 2. **Scalars**: a non-blank patch value replaces the old one; blank is a no-op
//! 3. **Agents / tools**: union by identity key, sub-fields merged recursively
//! 4. **Constraints**: union by key; objects merge key by key
//! 5. **Integrity**: tools used by an agent but not declared are declared

use super::document::{AgentSpec, SpecDocument};
use super::patch::SpecPatch;
use super::schema;
use super::vocabulary::{identity_key, CommunicationStyle, TopologyPattern};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// One observable effect of a merge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpecChange {
    /// A previously empty scalar field received a value
    FieldSet { field: String, value: String },
    /// A scalar field's value was replaced
    FieldOverwritten {
        field: String,
        previous: String,
        value: String,
    },
    AgentAdded { name: String },
    /// Sub-fields of an existing agent changed
    AgentUpdated { name: String, fields: Vec<String> },
    ToolAdded { name: String },
    /// Declared by the integrity pass because an agent uses it
    ToolAutoDeclared { name: String, used_by: String },
    ConstraintSet { name: String },
    AgentRetracted { name: String },
    ToolRetracted { name: String },
    ConstraintRetracted { name: String },
}

/// Result of applying one patch
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    pub document: SpecDocument,
    pub changes: Vec<SpecChange>,
}

impl MergeOutcome {
    /// True when the patch added nothing new
    pub fn is_noop(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Apply `patch` to a copy of `current`
pub fn merge(current: &SpecDocument, patch: &SpecPatch) -> MergeOutcome {
    let mut doc = current.clone();
    let mut changes = Vec::new();

    apply_retractions(&mut doc, patch, &mut changes);

    merge_text(&mut doc.task, patch.task.as_deref(), schema::TASK, &mut changes);
    merge_text(&mut doc.goal, patch.goal.as_deref(), schema::GOAL, &mut changes);
    merge_parsed(
        &mut doc.communication,
        patch.communication.as_deref().and_then(CommunicationStyle::parse),
        schema::COMMUNICATION,
        &mut changes,
    );
    merge_parsed(
        &mut doc.topology,
        patch.topology.as_deref().and_then(TopologyPattern::parse),
        schema::TOPOLOGY,
        &mut changes,
    );

    for incoming in &patch.agents {
        merge_agent(&mut doc, incoming, &mut changes);
    }

    for tool in &patch.tools {
        let tool = tool.trim();
        if !tool.is_empty() && !doc.has_tool(tool) {
            doc.tools.push(tool.to_string());
            changes.push(SpecChange::ToolAdded {
                name: tool.to_string(),
            });
        }
    }

    merge_constraints(&mut doc, patch, &mut changes);
    repair_tool_references(&mut doc, &mut changes);

    if !changes.is_empty() {
        tracing::debug!(changes = changes.len(), "Merged specification patch");
    }

    MergeOutcome {
        document: doc,
        changes,
    }
}

fn apply_retractions(doc: &mut SpecDocument, patch: &SpecPatch, changes: &mut Vec<SpecChange>) {
    let retract = &patch.retract;
    if retract.is_empty() {
        return;
    }

    let redeclared_agents: HashSet<String> = patch.agents.iter().map(|a| a.key()).collect();
    let redeclared_tools: HashSet<String> = patch
        .tools
        .iter()
        .chain(patch.agents.iter().flat_map(|a| a.tools.iter()))
        .map(|t| identity_key(t))
        .collect();
    let redeclared_constraints: HashSet<String> =
        patch.constraints.keys().map(|k| identity_key(k)).collect();

    let agent_keys: HashSet<String> = retract
        .agents
        .iter()
        .map(|a| identity_key(a))
        .filter(|k| !redeclared_agents.contains(k))
        .collect();
    let tool_keys: HashSet<String> = retract
        .tools
        .iter()
        .map(|t| identity_key(t))
        .filter(|k| !redeclared_tools.contains(k))
        .collect();
    let constraint_keys: HashSet<String> = retract
        .constraints
        .iter()
        .map(|c| identity_key(c))
        .filter(|k| !redeclared_constraints.contains(k))
        .collect();

    doc.agents.retain(|agent| {
        let keep = !agent_keys.contains(&agent.key());
        if !keep {
            changes.push(SpecChange::AgentRetracted {
                name: agent.name.clone(),
            });
        }
        keep
    });
    doc.tools.retain(|tool| {
        let keep = !tool_keys.contains(&identity_key(tool));
        if !keep {
            changes.push(SpecChange::ToolRetracted { name: tool.clone() });
        }
        keep
    });
    doc.constraints.retain(|name, _| {
        let keep = !constraint_keys.contains(&identity_key(name));
        if !keep {
            changes.push(SpecChange::ConstraintRetracted { name: name.clone() });
        }
        keep
    });

    for agent in &mut doc.agents {
        agent
            .communicates_with
            .retain(|p| !agent_keys.contains(&identity_key(p)));
        agent.tools.retain(|t| !tool_keys.contains(&identity_key(t)));
    }
}

fn merge_text(
    slot: &mut Option<String>,
    incoming: Option<&str>,
    field: &str,
    changes: &mut Vec<SpecChange>,
) {
    let Some(value) = incoming.map(str::trim).filter(|v| !v.is_empty()) else {
        return;
    };
    match slot.as_deref() {
        Some(previous) if previous == value => {}
        Some(previous) if !previous.trim().is_empty() => {
            changes.push(SpecChange::FieldOverwritten {
                field: field.to_string(),
                previous: previous.to_string(),
                value: value.to_string(),
            });
            *slot = Some(value.to_string());
        }
        _ => {
            changes.push(SpecChange::FieldSet {
                field: field.to_string(),
                value: value.to_string(),
            });
            *slot = Some(value.to_string());
        }
    }
}

fn merge_parsed<T>(slot: &mut Option<T>, incoming: Option<T>, field: &str, changes: &mut Vec<SpecChange>)
where
    T: PartialEq + std::fmt::Display,
{
    let Some(value) = incoming else {
        return;
    };
    match slot.take() {
        Some(previous) if previous == value => *slot = Some(previous),
        Some(previous) => {
            changes.push(SpecChange::FieldOverwritten {
                field: field.to_string(),
                previous: previous.to_string(),
                value: value.to_string(),
            });
            *slot = Some(value);
        }
        None => {
            changes.push(SpecChange::FieldSet {
                field: field.to_string(),
                value: value.to_string(),
            });
            *slot = Some(value);
        }
    }
}

/// Case-insensitive list union; returns true when anything was appended
fn union_names<'a>(
    target: &mut Vec<String>,
    incoming: impl IntoIterator<Item = &'a String>,
    exclude: Option<&str>,
) -> bool {
    let mut seen: HashSet<String> = target.iter().map(|t| identity_key(t)).collect();
    let excluded = exclude.map(identity_key);
    let mut changed = false;
    for name in incoming {
        let trimmed = name.trim();
        let key = identity_key(trimmed);
        if trimmed.is_empty() || excluded.as_ref() == Some(&key) {
            continue;
        }
        if seen.insert(key) {
            target.push(trimmed.to_string());
            changed = true;
        }
    }
    changed
}

fn merge_agent(doc: &mut SpecDocument, incoming: &AgentSpec, changes: &mut Vec<SpecChange>) {
    let name = incoming.name.trim();
    if name.is_empty() {
        return;
    }

    let Some(index) = doc.agent_index(name) else {
        let mut agent = AgentSpec::new(name);
        agent.description = incoming
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        union_names(&mut agent.capabilities, &incoming.capabilities, None);
        union_names(&mut agent.tools, &incoming.tools, None);
        union_names(&mut agent.communicates_with, &incoming.communicates_with, Some(name));
        changes.push(SpecChange::AgentAdded {
            name: agent.name.clone(),
        });
        doc.agents.push(agent);
        return;
    };

    let agent = &mut doc.agents[index];
    let own_name = agent.name.clone();
    let mut fields = Vec::new();

    if let Some(description) = incoming
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
    {
        if agent.description.as_deref() != Some(description) {
            agent.description = Some(description.to_string());
            fields.push("description".to_string());
        }
    }
    if union_names(&mut agent.capabilities, &incoming.capabilities, None) {
        fields.push("capabilities".to_string());
    }
    if union_names(&mut agent.tools, &incoming.tools, None) {
        fields.push("tools".to_string());
    }
    if union_names(
        &mut agent.communicates_with,
        &incoming.communicates_with,
        Some(&own_name),
    ) {
        fields.push("communicates_with".to_string());
    }

    if !fields.is_empty() {
        changes.push(SpecChange::AgentUpdated {
            name: own_name,
            fields,
        });
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn normalise_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.trim().to_string()),
        other => other.clone(),
    }
}

/// Scalar rule applied recursively through JSON objects
fn merge_value(existing: &Value, incoming: &Value) -> Value {
    if is_empty_value(incoming) {
        return existing.clone();
    }
    match (existing, incoming) {
        (Value::Object(old), Value::Object(new)) => {
            let mut merged = old.clone();
            for (key, value) in new {
                if is_empty_value(value) {
                    continue;
                }
                let next = match old.get(key) {
                    Some(previous) => merge_value(previous, value),
                    None => normalise_value(value),
                };
                merged.insert(key.clone(), next);
            }
            Value::Object(merged)
        }
        _ => normalise_value(incoming),
    }
}

fn merge_constraints(doc: &mut SpecDocument, patch: &SpecPatch, changes: &mut Vec<SpecChange>) {
    for (name, value) in &patch.constraints {
        let name = name.trim();
        if name.is_empty() || is_empty_value(value) {
            continue;
        }
        let key = identity_key(name);
        let existing_name = doc
            .constraints
            .keys()
            .find(|k| identity_key(k) == key)
            .cloned();

        match existing_name {
            Some(existing_name) => {
                let Some(previous) = doc.constraints.get(&existing_name) else {
                    continue;
                };
                let merged = merge_value(previous, value);
                if &merged != previous {
                    doc.constraints.insert(existing_name.clone(), merged);
                    changes.push(SpecChange::ConstraintSet {
                        name: existing_name,
                    });
                }
            }
            None => {
                doc.constraints
                    .insert(name.to_string(), merge_value(&Value::Null, value));
                changes.push(SpecChange::ConstraintSet {
                    name: name.to_string(),
                });
            }
        }
    }
}

fn repair_tool_references(doc: &mut SpecDocument, changes: &mut Vec<SpecChange>) {
    let mut missing = Vec::new();
    for agent in &doc.agents {
        for tool in &agent.tools {
            let already_queued = missing
                .iter()
                .any(|(name, _): &(String, String)| identity_key(name) == identity_key(tool));
            if !doc.has_tool(tool) && !already_queued {
                missing.push((tool.clone(), agent.name.clone()));
            }
        }
    }
    for (name, used_by) in missing {
        tracing::debug!(tool = %name, agent = %used_by, "Auto-declaring referenced tool");
        doc.tools.push(name.clone());
        changes.push(SpecChange::ToolAutoDeclared { name, used_by });
    }
}
