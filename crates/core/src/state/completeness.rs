//! # Completeness Checker
//!
//! Rule-based checklist over a `SpecDocument`. The ordered issue list decides
//! the turn phase and which clarifying question accompanies the next reply.
//! Advisory suggestions are produced separately and only steer the prompt.

use super::document::SpecDocument;
use super::schema::{self, FieldSpec};
use super::vocabulary::identity_key;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Category of a missing or ambiguous aspect, in checklist order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueCategory {
    MissingTask,
    MissingAgents,
    MissingCommunication,
    MissingTopology,
    UndefinedCommunication,
    DanglingPartner,
    UnconstrainedTool,
    MissingConstraints,
}

impl IssueCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingTask => "missing-task",
            Self::MissingAgents => "missing-agents",
            Self::MissingCommunication => "missing-communication",
            Self::MissingTopology => "missing-topology",
            Self::UndefinedCommunication => "undefined-communication",
            Self::DanglingPartner => "dangling-partner",
            Self::UnconstrainedTool => "unconstrained-tool",
            Self::MissingConstraints => "missing-constraints",
        }
    }
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One missing or ambiguous aspect of the specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecIssue {
    pub category: IssueCategory,
    /// Agent, tool or partner the issue is about, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Ready-to-ask clarifying question
    pub question: String,
}

impl SpecIssue {
    fn new(category: IssueCategory, question: impl Into<String>) -> Self {
        Self {
            category,
            subject: None,
            question: question.into(),
        }
    }

    fn about(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }
}

fn ask(field: &str) -> &'static str {
    schema::field(field).map(|f: &FieldSpec| f.ask_user).unwrap_or("Could you tell me more?")
}

/// Whether communication edges can be derived without declared partners
fn topology_yields_edges(doc: &SpecDocument) -> bool {
    doc.topology
        .as_ref()
        .is_some_and(|t| !t.is_free_text() && !t.as_str().trim().is_empty())
}

/// Evaluate the checklist; an empty result means the specification is complete
pub fn check(doc: &SpecDocument) -> Vec<SpecIssue> {
    let mut issues = Vec::new();
    let agent_count = doc.agents.len();

    // Once agents exist a missing task is only advisory
    if agent_count == 0 && !doc.has_field(schema::TASK) {
        issues.push(SpecIssue::new(IssueCategory::MissingTask, ask(schema::TASK)));
    }
    if agent_count == 0 {
        issues.push(SpecIssue::new(IssueCategory::MissingAgents, ask(schema::AGENTS)));
    }
    if agent_count >= 2 && !doc.has_field(schema::COMMUNICATION) {
        issues.push(SpecIssue::new(
            IssueCategory::MissingCommunication,
            ask(schema::COMMUNICATION),
        ));
    }
    if agent_count >= 3 && !doc.has_field(schema::TOPOLOGY) {
        issues.push(SpecIssue::new(IssueCategory::MissingTopology, ask(schema::TOPOLOGY)));
    }

    let any_partners = doc.agents.iter().any(|a| !a.communicates_with.is_empty());
    if agent_count >= 2 && !any_partners && !topology_yields_edges(doc) {
        issues.push(SpecIssue::new(
            IssueCategory::UndefinedCommunication,
            "Which agents talk to each other directly, and who hands work to whom?",
        ));
    }

    let agent_keys: HashSet<String> = doc.agents.iter().map(|a| a.key()).collect();
    for agent in &doc.agents {
        for partner in &agent.communicates_with {
            if !agent_keys.contains(&identity_key(partner)) {
                issues.push(
                    SpecIssue::new(
                        IssueCategory::DanglingPartner,
                        format!(
                            "{} is set to talk to {}, which is not an agent yet. Should I add {} as an agent?",
                            agent.name, partner, partner
                        ),
                    )
                    .about(format!("{} -> {}", agent.name, partner)),
                );
            }
        }
    }

    for tool in &doc.tools {
        if !doc.agents.iter().any(|a| a.uses_tool(tool)) {
            issues.push(
                SpecIssue::new(
                    IssueCategory::UnconstrainedTool,
                    format!("Which agent should use the {} tool?", tool),
                )
                .about(tool.clone()),
            );
        }
    }

    if agent_count > 0 && doc.constraints.is_empty() {
        issues.push(SpecIssue::new(
            IssueCategory::MissingConstraints,
            ask(schema::CONSTRAINTS),
        ));
    }

    issues
}

pub fn is_complete(doc: &SpecDocument) -> bool {
    check(doc).is_empty()
}

/// Proactive hints for the extraction prompt; never affect the phase
pub fn suggestions(doc: &SpecDocument) -> Vec<String> {
    let mut hints = Vec::new();
    if doc.is_empty() {
        return hints;
    }

    if !doc.has_field(schema::TASK) {
        hints.push("The overall task is not captured; ask what the system is for.".to_string());
    }
    for agent in doc.agents.iter().filter(|a| !a.has_description()) {
        hints.push(format!(
            "Agent `{}` has no role description; ask what it is responsible for.",
            agent.name
        ));
    }
    if !doc.has_field(schema::COMMUNICATION) {
        hints.push(
            "Communication style is not captured (direct, broadcast, hierarchical, blackboard, publish/subscribe).".to_string(),
        );
    }
    if !doc.has_field(schema::TOPOLOGY) {
        hints.push("Topology is not captured (star, pipeline, hierarchical, mesh, ring).".to_string());
    }

    let constraint_mentions = |needle: &str| doc.constraints.keys().any(|k| identity_key(k).contains(needle));
    if !constraint_mentions("memory") {
        hints.push("Ask whether agents need shared or private memory.".to_string());
    }
    if !constraint_mentions("plan") {
        hints.push("Ask how tasks are planned and decomposed across agents.".to_string());
    }

    hints
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::document::AgentSpec;
    use crate::state::vocabulary::{CommunicationStyle, TopologyPattern};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn categories(doc: &SpecDocument) -> Vec<IssueCategory> {
        check(doc).into_iter().map(|i| i.category).collect()
    }

    #[test]
    fn test_empty_document() {
        let doc = SpecDocument::default();
        assert_eq!(
            categories(&doc),
            vec![IssueCategory::MissingTask, IssueCategory::MissingAgents]
        );
        assert!(suggestions(&doc).is_empty());
    }

    #[test]
    fn test_four_agents_without_structure() {
        let doc = SpecDocument {
            task: Some("Customer service".to_string()),
            agents: vec![
                AgentSpec::new("Manager"),
                AgentSpec::new("Billing"),
                AgentSpec::new("Shipping"),
                AgentSpec::new("Returns"),
            ],
            ..SpecDocument::default()
        };
        let found = categories(&doc);
        assert_eq!(
            found,
            vec![
                IssueCategory::MissingCommunication,
                IssueCategory::MissingTopology,
                IssueCategory::UndefinedCommunication,
                IssueCategory::MissingConstraints,
            ]
        );
        let first = &check(&doc)[0];
        assert_eq!(first.question, ask(schema::COMMUNICATION));
    }

    #[test]
    fn test_two_agents_do_not_need_topology() {
        let doc = SpecDocument {
            task: Some("Pair programming".to_string()),
            agents: vec![
                AgentSpec::new("Driver").with_partners(["Navigator"]),
                AgentSpec::new("Navigator"),
            ],
            communication: Some(CommunicationStyle::Direct),
            constraints: BTreeMap::from([("latency".to_string(), json!("low"))]),
            ..SpecDocument::default()
        };
        assert!(is_complete(&doc));
    }

    #[test]
    fn test_complete_pipeline_document() {
        let doc = SpecDocument {
            task: Some("Content pipeline".to_string()),
            agents: vec![
                AgentSpec::new("Researcher"),
                AgentSpec::new("Writer"),
                AgentSpec::new("Editor"),
            ],
            communication: Some(CommunicationStyle::Direct),
            topology: Some(TopologyPattern::Pipeline),
            constraints: BTreeMap::from([("deadline".to_string(), json!("1h"))]),
            ..SpecDocument::default()
        };
        assert!(check(&doc).is_empty());
        // descriptions are advisory only
        assert!(suggestions(&doc)
            .iter()
            .any(|s| s.contains("`Researcher` has no role description")));
    }

    #[test]
    fn test_free_text_topology_without_partners_is_undefined() {
        let doc = SpecDocument {
            task: Some("x".to_string()),
            agents: vec![AgentSpec::new("A"), AgentSpec::new("B")],
            communication: Some(CommunicationStyle::Direct),
            topology: Some(TopologyPattern::Other("whatever works".to_string())),
            constraints: BTreeMap::from([("budget".to_string(), json!(5))]),
            ..SpecDocument::default()
        };
        assert_eq!(categories(&doc), vec![IssueCategory::UndefinedCommunication]);
    }

    #[test]
    fn test_dangling_partner_and_unused_tool() {
        let doc = SpecDocument {
            task: Some("x".to_string()),
            agents: vec![AgentSpec::new("Lead").with_partners(["Ghost"])],
            tools: vec!["pager".to_string()],
            constraints: BTreeMap::from([("budget".to_string(), json!(5))]),
            ..SpecDocument::default()
        };
        let issues = check(&doc);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].category, IssueCategory::DanglingPartner);
        assert_eq!(issues[0].subject.as_deref(), Some("Lead -> Ghost"));
        assert_eq!(issues[1].category, IssueCategory::UnconstrainedTool);
        assert_eq!(issues[1].subject.as_deref(), Some("pager"));
    }

    #[test]
    fn test_missing_task_is_advisory_once_agents_exist() {
        let doc = SpecDocument {
            agents: vec![
                AgentSpec::new("Collector"),
                AgentSpec::new("Analyst"),
                AgentSpec::new("Reporter"),
            ],
            communication: Some(CommunicationStyle::Direct),
            topology: Some(TopologyPattern::Pipeline),
            constraints: BTreeMap::from([("deadline".to_string(), json!("daily"))]),
            ..SpecDocument::default()
        };
        assert!(check(&doc).is_empty());
        assert!(suggestions(&doc).iter().any(|s| s.contains("overall task")));
    }

    #[test]
    fn test_category_serializes_kebab_case() {
        let json = serde_json::to_value(IssueCategory::UndefinedCommunication).unwrap();
        assert_eq!(json, "undefined-communication");
        assert_eq!(IssueCategory::MissingTopology.to_string(), "missing-topology");
    }

    #[test]
    fn test_memory_and_planning_suggestions_clear_once_captured() {
        let doc = SpecDocument {
            task: Some("x".to_string()),
            constraints: BTreeMap::from([
                ("shared_memory".to_string(), json!(true)),
                ("planning".to_string(), json!("manager decomposes")),
            ]),
            ..SpecDocument::default()
        };
        let hints = suggestions(&doc);
        assert!(!hints.iter().any(|h| h.contains("memory")));
        assert!(!hints.iter().any(|h| h.contains("planned")));
    }
}
