//! Mermaid flowchart rendering for the topology graph.

use super::{EdgeKind, NodeKind, TopologyGraph};

fn mermaid_id(id: &str) -> String {
    id.replace(':', "_")
}

fn escape_label(label: &str) -> String {
    label.replace('"', "#quot;")
}

impl TopologyGraph {
    /// Render as a `flowchart LR` block (without code fences)
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("flowchart LR\n");

        for node in &self.nodes {
            let id = mermaid_id(&node.id);
            let label = escape_label(&node.label);
            match node.kind {
                NodeKind::Agent => out.push_str(&format!("    {}[\"{}\"]\n", id, label)),
                NodeKind::Tool => out.push_str(&format!("    {}[(\"{}\")]\n", id, label)),
            }
        }

        for edge in &self.edges {
            let arrow = match (edge.kind, edge.directed) {
                (EdgeKind::ToolUse, _) => "-.->",
                (EdgeKind::Communication, true) => "-->",
                (EdgeKind::Communication, false) => "---",
            };
            out.push_str(&format!(
                "    {} {} {}\n",
                mermaid_id(&edge.source),
                arrow,
                mermaid_id(&edge.target)
            ));
        }

        out
    }
}
