//! # Topology Graph
//!
//! Derived view of a specification: one node per agent and tool, edges for
//! communication and tool use. Always recomputed from the document through
//! [`project`]; nothing writes back.
//!
//! ```text
//! SpecDocument ──project()──► TopologyGraph ──to_mermaid()──► flowchart text
//! ```

pub mod mermaid;
pub mod projector;

pub use projector::{lead_agent, project};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Agent,
    Tool,
}

/// A node with a stable id derived from its name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    /// `agent:<slug>` or `tool:<slug>`
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Communication,
    ToolUse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    /// False means the edge is bidirectional
    pub directed: bool,
    /// Derived from the topology pattern rather than declared partners
    #[serde(default)]
    pub inferred: bool,
}

/// Node and edge lists for rendering
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl TopologyGraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn communication_edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.edges.iter().filter(|e| e.kind == EdgeKind::Communication)
    }

    pub fn tool_edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.edges.iter().filter(|e| e.kind == EdgeKind::ToolUse)
    }
}
