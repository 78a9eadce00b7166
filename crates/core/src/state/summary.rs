//! Human-readable Markdown digest of a specification.

use super::completeness::SpecIssue;
use super::document::SpecDocument;
use serde_json::Value;

fn or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

fn constraint_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render the digest; `issues` becomes the "Open questions" section
pub fn render_summary(doc: &SpecDocument, issues: &[SpecIssue]) -> String {
    let mut out = String::from("# Multi-Agent System Specification\n\n");

    out.push_str(&format!(
        "**Task:** {}\n",
        doc.task.as_deref().unwrap_or("_not yet defined_")
    ));
    if let Some(goal) = doc.goal.as_deref() {
        out.push_str(&format!("**Goal:** {}\n", goal));
    }

    out.push_str("\n## Agents\n\n");
    if doc.agents.is_empty() {
        out.push_str("_No agents yet._\n");
    } else {
        out.push_str("| Agent | Role | Tools | Talks to |\n|---|---|---|---|\n");
        for agent in &doc.agents {
            out.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                agent.name,
                agent.description.as_deref().unwrap_or("-"),
                or_dash(&agent.tools),
                or_dash(&agent.communicates_with),
            ));
        }
    }

    out.push_str(&format!("\n**Tools:** {}\n", or_dash(&doc.tools)));
    out.push_str(&format!(
        "**Communication:** {}\n",
        doc.communication
            .as_ref()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_string())
    ));
    out.push_str(&format!(
        "**Topology:** {}\n",
        doc.topology
            .as_ref()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string())
    ));

    if !doc.constraints.is_empty() {
        out.push_str("\n## Constraints\n\n");
        for (name, value) in &doc.constraints {
            out.push_str(&format!("- **{}**: {}\n", name, constraint_text(value)));
        }
    }

    if !issues.is_empty() {
        out.push_str("\n## Open questions\n\n");
        for issue in issues {
            out.push_str(&format!("- [{}] {}\n", issue.category, issue.question));
        }
    }

    out
}
