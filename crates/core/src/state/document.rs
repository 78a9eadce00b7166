//! # Specification Document
//!
//! The structured record of the multi-agent design under construction.
//! One instance per conversation session; it is only ever replaced as a
//! whole by the merge engine, never edited through the graph.

use super::schema;
use super::vocabulary::{identity_key, CommunicationStyle, TopologyPattern};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// One agent role in the design
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentSpec {
    /// Unique name/role (identity is case-insensitive)
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Tools this agent uses; every entry must exist in `SpecDocument::tools`
    #[serde(default)]
    pub tools: Vec<String>,
    /// Declared communication partners (agent names)
    #[serde(default)]
    pub communicates_with: Vec<String>,
}

impl AgentSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_partners<I, S>(mut self, partners: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.communicates_with = partners.into_iter().map(Into::into).collect();
        self
    }

    pub fn key(&self) -> String {
        identity_key(&self.name)
    }

    pub fn has_description(&self) -> bool {
        self.description
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty())
    }

    pub fn uses_tool(&self, tool: &str) -> bool {
        let key = identity_key(tool);
        self.tools.iter().any(|t| identity_key(t) == key)
    }
}

/// The specification of a multi-agent system
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    #[serde(default)]
    pub agents: Vec<AgentSpec>,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub communication: Option<CommunicationStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topology: Option<TopologyPattern>,
    #[serde(default)]
    pub constraints: BTreeMap<String, serde_json::Value>,
}

impl SpecDocument {
    /// Fresh, empty document for a new session
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn agent(&self, name: &str) -> Option<&AgentSpec> {
        let key = identity_key(name);
        self.agents.iter().find(|a| a.key() == key)
    }

    pub fn agent_index(&self, name: &str) -> Option<usize> {
        let key = identity_key(name);
        self.agents.iter().position(|a| a.key() == key)
    }

    pub fn has_tool(&self, name: &str) -> bool {
        let key = identity_key(name);
        self.tools.iter().any(|t| identity_key(t) == key)
    }

    /// Whether the named top-level field holds information
    pub fn has_field(&self, name: &str) -> bool {
        match name {
            schema::TASK => has_text(&self.task),
            schema::GOAL => has_text(&self.goal),
            schema::AGENTS => !self.agents.is_empty(),
            schema::TOOLS => !self.tools.is_empty(),
            schema::COMMUNICATION => self
                .communication
                .as_ref()
                .is_some_and(|c| !c.as_str().trim().is_empty()),
            schema::TOPOLOGY => self
                .topology
                .as_ref()
                .is_some_and(|t| !t.as_str().trim().is_empty()),
            schema::CONSTRAINTS => !self.constraints.is_empty(),
            _ => false,
        }
    }

    /// Tool names referenced by agents but missing from `tools`
    pub fn dangling_tool_refs(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.agents
            .iter()
            .flat_map(|a| a.tools.iter())
            .filter(|t| !self.has_tool(t))
            .filter(|t| seen.insert(identity_key(t)))
            .cloned()
            .collect()
    }

    /// Describe every broken structural invariant; empty when sound
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();

        let mut agent_keys = HashSet::new();
        for agent in &self.agents {
            if agent.name.trim().is_empty() {
                violations.push("agent with blank name".to_string());
            } else if !agent_keys.insert(agent.key()) {
                violations.push(format!("duplicate agent name `{}`", agent.name));
            }
        }

        let mut tool_keys = HashSet::new();
        for tool in &self.tools {
            if !tool_keys.insert(identity_key(tool)) {
                violations.push(format!("duplicate tool `{}`", tool));
            }
        }

        for tool in self.dangling_tool_refs() {
            violations.push(format!("tool `{}` used by an agent but not declared", tool));
        }

        violations
    }
}

fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document_is_empty() {
        let doc = SpecDocument::new();
        assert!(doc.is_empty());
        assert!(doc.invariant_violations().is_empty());
    }

    #[test]
    fn test_agent_lookup_is_case_insensitive() {
        let doc = SpecDocument {
            agents: vec![AgentSpec::new("Manager")],
            ..SpecDocument::default()
        };
        assert!(doc.agent(" manager ").is_some());
        assert_eq!(doc.agent_index("MANAGER"), Some(0));
    }

    #[test]
    fn test_invariant_violations_detect_duplicates_and_dangling_tools() {
        let doc = SpecDocument {
            agents: vec![
                AgentSpec::new("Researcher").with_tools(["web_search"]),
                AgentSpec::new("researcher"),
            ],
            ..SpecDocument::default()
        };
        let violations = doc.invariant_violations();
        assert_eq!(violations.len(), 2);
        assert_eq!(doc.dangling_tool_refs(), vec!["web_search".to_string()]);
    }

    #[test]
    fn test_serialization_uses_spec_field_names() {
        let doc = SpecDocument {
            task: Some("Support desk".to_string()),
            topology: Some(TopologyPattern::Star),
            ..SpecDocument::default()
        };
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["task"], "Support desk");
        assert_eq!(json["topology"], "star");
        assert!(json["agents"].as_array().unwrap().is_empty());
        assert!(json.get("goal").is_none());
    }
}
