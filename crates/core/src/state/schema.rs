//! # Specification Schema
//!
//! Static description of every specification field. The same table drives
//! the extraction prompt, the patch validator's notion of "known field", and
//! the list of missing required fields.

use super::document::SpecDocument;

/// Shape of a field's value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    List,
    Map,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "string",
            FieldType::List => "list",
            FieldType::Map => "object",
        }
    }
}

/// One row of the schema table
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub required: bool,
    pub field_type: FieldType,
    pub description: &'static str,
    /// Question to put to the user when the field is missing
    pub ask_user: &'static str,
    pub example: &'static str,
    /// Keys of list/object entries, when structured
    pub structure: &'static [&'static str],
}

pub const TASK: &str = "task";
pub const GOAL: &str = "goal";
pub const AGENTS: &str = "agents";
pub const TOOLS: &str = "tools";
pub const COMMUNICATION: &str = "communication";
pub const TOPOLOGY: &str = "topology";
pub const CONSTRAINTS: &str = "constraints";
/// Not a document field; carries explicit deletions in a patch
pub const RETRACT: &str = "retract";

pub const SPEC_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: TASK,
        required: true,
        field_type: FieldType::Text,
        description: "Overall purpose of the multi-agent system.",
        ask_user: "What should the multi-agent system accomplish overall?",
        example: "Customer service system for an online shop",
        structure: &[],
    },
    FieldSpec {
        name: GOAL,
        required: false,
        field_type: FieldType::Text,
        description: "Refinement of the intent: success criteria or the outcome the user cares about.",
        ask_user: "What does success look like for this system?",
        example: "Resolve 80% of tickets without a human",
        structure: &[],
    },
    FieldSpec {
        name: AGENTS,
        required: true,
        field_type: FieldType::List,
        description: "Agent roles. Names are unique; tools lists name the tools the agent uses; communicates_with names other agents.",
        ask_user: "Which agents (roles) should the system have, and what does each one do?",
        example: "manager, billing_specialist, shipping_specialist",
        structure: &["name", "description", "capabilities", "tools", "communicates_with"],
    },
    FieldSpec {
        name: TOOLS,
        required: false,
        field_type: FieldType::List,
        description: "Tools available to the agents, by name.",
        ask_user: "Which tools or external services do the agents need?",
        example: "web_search, order_database",
        structure: &[],
    },
    FieldSpec {
        name: COMMUNICATION,
        required: true,
        field_type: FieldType::Text,
        description: "Messaging style: broadcast, direct, hierarchical, blackboard, publish_subscribe, or free text.",
        ask_user: "How should the agents communicate: direct messages, broadcast, through a manager, or a shared blackboard?",
        example: "direct",
        structure: &[],
    },
    FieldSpec {
        name: TOPOLOGY,
        required: true,
        field_type: FieldType::Text,
        description: "Structural pattern: star, pipeline, mesh, hierarchical, ring, or free text.",
        ask_user: "How are the agents arranged: a star around a coordinator, a pipeline, a hierarchy, or a mesh?",
        example: "star",
        structure: &[],
    },
    FieldSpec {
        name: CONSTRAINTS,
        required: false,
        field_type: FieldType::Map,
        description: "Named constraints (latency, budget, memory, planning, compliance, ...) mapped to a value or description.",
        ask_user: "Are there constraints the design must respect, such as latency, budget, memory or compliance?",
        example: "{\"max_latency\": \"2s\", \"memory\": \"shared\"}",
        structure: &[],
    },
];

/// Look up a field by name
pub fn field(name: &str) -> Option<&'static FieldSpec> {
    SPEC_FIELDS.iter().find(|f| f.name == name)
}

/// Whether a top-level patch key is understood
pub fn is_known_patch_key(name: &str) -> bool {
    name == RETRACT || field(name).is_some()
}

/// Required fields that are still empty, in schema order
pub fn missing_required_fields(doc: &SpecDocument) -> Vec<&'static str> {
    SPEC_FIELDS
        .iter()
        .filter(|f| f.required && !doc.has_field(f.name))
        .map(|f| f.name)
        .collect()
}

/// Render the table for the extraction prompt
pub fn schema_summary() -> String {
    SPEC_FIELDS
        .iter()
        .map(describe_field)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn describe_field(meta: &FieldSpec) -> String {
    let required = if meta.required { "required" } else { "optional" };
    let mut lines = vec![
        format!(
            "- {} ({}, type={}): {}",
            meta.name,
            required,
            meta.field_type.as_str(),
            meta.description
        ),
        format!("  Ask user: {}", meta.ask_user),
    ];
    if !meta.example.is_empty() {
        lines.push(format!("  Example: {}", meta.example));
    }
    if !meta.structure.is_empty() {
        lines.push(format!(
            "  This is a LIST of OBJECTS with keys: {}",
            meta.structure.join(", ")
        ));
    }
    lines.join("\n")
}
