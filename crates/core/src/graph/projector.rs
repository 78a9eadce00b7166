//! # Graph Projector
//!
//! Pure function from `SpecDocument` to `TopologyGraph`. Output order follows
//! document order, so the same document always yields the same graph.

use super::{EdgeKind, GraphEdge, GraphNode, NodeKind, TopologyGraph};
use crate::state::vocabulary::{has_word, identity_key, slugify, TopologyPattern};
use crate::state::{AgentSpec, SpecDocument};
use std::collections::{HashMap, HashSet};

/// Words that mark an agent as the hub of a star or the top of a hierarchy
const LEAD_KEYWORDS: &[&str] = &[
    "manager",
    "coordinator",
    "orchestrator",
    "supervisor",
    "lead",
    "planner",
    "router",
];

fn mentions_lead(agent: &AgentSpec) -> bool {
    let name = agent.name.to_lowercase();
    let description = agent.description.as_deref().unwrap_or("").to_lowercase();
    LEAD_KEYWORDS
        .iter()
        .any(|k| has_word(&name, k) || has_word(&description, k))
}

/// Index of the hub/lead agent, if there are any agents
pub fn lead_agent(doc: &SpecDocument) -> Option<usize> {
    if doc.agents.is_empty() {
        return None;
    }
    Some(doc.agents.iter().position(mentions_lead).unwrap_or(0))
}

/// Allocates unique node ids, suffixing `_2`, `_3`, ... on slug collisions
#[derive(Default)]
struct IdAllocator {
    used: HashSet<String>,
}

impl IdAllocator {
    fn allocate(&mut self, prefix: &str, name: &str) -> String {
        let slug = match slugify(name) {
            s if s.is_empty() => "unnamed".to_string(),
            s => s,
        };
        let base = format!("{}:{}", prefix, slug);
        let mut id = base.clone();
        let mut n = 2;
        while !self.used.insert(id.clone()) {
            id = format!("{}_{}", base, n);
            n += 1;
        }
        id
    }
}

struct EdgeSet {
    edges: Vec<GraphEdge>,
    seen: HashSet<(String, String, bool)>,
}

impl EdgeSet {
    fn new() -> Self {
        Self {
            edges: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn push(&mut self, source: &str, target: &str, kind: EdgeKind, directed: bool, inferred: bool) {
        if source == target {
            return;
        }
        // undirected pairs collapse regardless of orientation
        let key = if directed || source < target {
            (source.to_string(), target.to_string(), directed)
        } else {
            (target.to_string(), source.to_string(), directed)
        };
        if self.seen.insert(key) {
            self.edges.push(GraphEdge {
                source: source.to_string(),
                target: target.to_string(),
                kind,
                directed,
                inferred,
            });
        }
    }
}

/// Derive the topology graph
pub fn project(doc: &SpecDocument) -> TopologyGraph {
    let mut ids = IdAllocator::default();
    let mut nodes = Vec::new();

    let agent_ids: Vec<String> = doc
        .agents
        .iter()
        .map(|agent| {
            let id = ids.allocate("agent", &agent.name);
            nodes.push(GraphNode {
                id: id.clone(),
                label: agent.name.clone(),
                kind: NodeKind::Agent,
            });
            id
        })
        .collect();
    let agent_by_key: HashMap<String, usize> = doc
        .agents
        .iter()
        .enumerate()
        .rev()
        .map(|(i, a)| (a.key(), i))
        .collect();

    let mut tool_by_key: HashMap<String, String> = HashMap::new();
    for tool in doc.tools.iter().chain(doc.dangling_tool_refs().iter()) {
        let key = identity_key(tool);
        if key.is_empty() || tool_by_key.contains_key(&key) {
            continue;
        }
        let id = ids.allocate("tool", tool);
        nodes.push(GraphNode {
            id: id.clone(),
            label: tool.trim().to_string(),
            kind: NodeKind::Tool,
        });
        tool_by_key.insert(key, id);
    }

    let mut edges = EdgeSet::new();
    let lead = lead_agent(doc);
    let declared = doc.agents.iter().any(|a| !a.communicates_with.is_empty());

    if declared {
        for (i, agent) in doc.agents.iter().enumerate() {
            for partner in &agent.communicates_with {
                let Some(&j) = agent_by_key.get(&identity_key(partner)) else {
                    continue;
                };
                match doc.topology {
                    Some(TopologyPattern::Hierarchical) if Some(j) == lead => {
                        edges.push(&agent_ids[j], &agent_ids[i], EdgeKind::Communication, true, false)
                    }
                    Some(TopologyPattern::Hierarchical)
                    | Some(TopologyPattern::Pipeline)
                    | Some(TopologyPattern::Ring) => {
                        edges.push(&agent_ids[i], &agent_ids[j], EdgeKind::Communication, true, false)
                    }
                    _ => edges.push(&agent_ids[i], &agent_ids[j], EdgeKind::Communication, false, false),
                }
            }
        }
    } else {
        infer_communication(doc, &agent_ids, lead, &mut edges);
    }

    for (i, agent) in doc.agents.iter().enumerate() {
        for tool in &agent.tools {
            if let Some(tool_id) = tool_by_key.get(&identity_key(tool)) {
                edges.push(&agent_ids[i], tool_id, EdgeKind::ToolUse, true, false);
            }
        }
    }

    TopologyGraph {
        nodes,
        edges: edges.edges,
    }
}

fn infer_communication(doc: &SpecDocument, ids: &[String], lead: Option<usize>, edges: &mut EdgeSet) {
    let n = ids.len();
    let comm = EdgeKind::Communication;
    match (&doc.topology, lead) {
        (Some(TopologyPattern::Pipeline), _) => {
            for pair in ids.windows(2) {
                edges.push(&pair[0], &pair[1], comm, true, true);
            }
        }
        (Some(TopologyPattern::Ring), _) => {
            for pair in ids.windows(2) {
                edges.push(&pair[0], &pair[1], comm, true, true);
            }
            if n >= 3 {
                edges.push(&ids[n - 1], &ids[0], comm, true, true);
            }
        }
        (Some(TopologyPattern::Star), Some(hub)) => {
            for (_, id) in ids.iter().enumerate().filter(|(i, _)| *i != hub) {
                edges.push(&ids[hub], id, comm, false, true);
            }
        }
        (Some(TopologyPattern::Hierarchical), Some(top)) => {
            for (_, id) in ids.iter().enumerate().filter(|(i, _)| *i != top) {
                edges.push(&ids[top], id, comm, true, true);
            }
        }
        (Some(TopologyPattern::Mesh), _) => {
            for i in 0..n {
                for j in (i + 1)..n {
                    edges.push(&ids[i], &ids[j], comm, false, true);
                }
            }
        }
        _ => {}
    }
}
