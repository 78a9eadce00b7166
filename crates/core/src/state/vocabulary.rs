//! # Design Vocabulary
//!
//! Small enumerated vocabularies for the `communication` and `topology`
//! fields, with free-text fallback, plus the name normalisation used for
//! identity keys and graph ids.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// How agents exchange messages
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CommunicationStyle {
    /// Every message goes to every agent
    Broadcast,
    /// Point-to-point messages between named partners
    Direct,
    /// Managers delegate to subordinates and collect results
    Hierarchical,
    /// Agents read and write a shared workspace
    Blackboard,
    /// Agents subscribe to topics
    PublishSubscribe,
    /// Anything the vocabulary does not cover, kept verbatim
    Other(String),
}

impl CommunicationStyle {
    /// Parse free text, recognising common synonyms. Blank input yields `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        let lower = trimmed.to_lowercase();
        let style = if contains_any(&lower, &["pub/sub", "pubsub", "publish", "subscribe", "topic"]) {
            Self::PublishSubscribe
        } else if contains_any(&lower, &["blackboard", "shared memory", "shared state", "shared workspace"]) {
            Self::Blackboard
        } else if contains_any(&lower, &["broadcast", "everyone", "all agents"]) {
            Self::Broadcast
        } else if contains_any(&lower, &["hierarch", "delegat", "manager", "chain of command", "top-down"]) {
            Self::Hierarchical
        } else if has_word(&lower, "direct")
            || contains_any(&lower, &["point-to-point", "peer-to-peer", "one-to-one", "p2p"])
        {
            Self::Direct
        } else {
            Self::Other(trimmed.to_string())
        };
        Some(style)
    }

    /// Canonical label
    pub fn as_str(&self) -> &str {
        match self {
            Self::Broadcast => "broadcast",
            Self::Direct => "direct",
            Self::Hierarchical => "hierarchical",
            Self::Blackboard => "blackboard",
            Self::PublishSubscribe => "publish_subscribe",
            Self::Other(text) => text,
        }
    }

    pub fn is_free_text(&self) -> bool {
        matches!(self, Self::Other(_))
    }
}

impl From<String> for CommunicationStyle {
    fn from(text: String) -> Self {
        Self::parse(&text).unwrap_or(Self::Other(text))
    }
}

impl From<CommunicationStyle> for String {
    fn from(style: CommunicationStyle) -> Self {
        style.as_str().to_string()
    }
}

impl fmt::Display for CommunicationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural pattern connecting the agents
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TopologyPattern {
    /// One hub, every other agent a spoke
    Star,
    /// Agents hand work along in order
    Pipeline,
    /// Every agent may talk to every other
    Mesh,
    /// A lead agent above the others
    Hierarchical,
    /// A closed pipeline
    Ring,
    /// Anything the vocabulary does not cover, kept verbatim
    Other(String),
}

impl TopologyPattern {
    /// Parse free text, recognising common synonyms. Blank input yields `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        let lower = trimmed.to_lowercase();
        let pattern = if has_word(&lower, "ring")
            || contains_any(&lower, &["circular", "round-robin", "round robin"])
        {
            Self::Ring
        } else if has_word(&lower, "chain")
            || contains_any(&lower, &["pipeline", "sequential", "assembly line", "linear"])
        {
            Self::Pipeline
        } else if has_word(&lower, "star")
            || has_word(&lower, "hub")
            || contains_any(&lower, &["centralized", "centralised"])
        {
            Self::Star
        } else if has_word(&lower, "tree")
            || contains_any(&lower, &["hierarch", "manager", "supervisor"])
        {
            Self::Hierarchical
        } else if has_word(&lower, "mesh")
            || contains_any(&lower, &["peer-to-peer", "peer to peer", "fully connected", "decentral"])
        {
            Self::Mesh
        } else {
            Self::Other(trimmed.to_string())
        };
        Some(pattern)
    }

    /// Canonical label
    pub fn as_str(&self) -> &str {
        match self {
            Self::Star => "star",
            Self::Pipeline => "pipeline",
            Self::Mesh => "mesh",
            Self::Hierarchical => "hierarchical",
            Self::Ring => "ring",
            Self::Other(text) => text,
        }
    }

    pub fn is_free_text(&self) -> bool {
        matches!(self, Self::Other(_))
    }
}

impl From<String> for TopologyPattern {
    fn from(text: String) -> Self {
        Self::parse(&text).unwrap_or(Self::Other(text))
    }
}

impl From<TopologyPattern> for String {
    fn from(pattern: TopologyPattern) -> Self {
        pattern.as_str().to_string()
    }
}

impl fmt::Display for TopologyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

// Whole-word match; "monitoring" must not read as "ring".
pub(crate) fn has_word(haystack: &str, word: &str) -> bool {
    haystack
        .split(|c: char| !c.is_alphanumeric())
        .any(|token| token == word)
}

/// Identity key for agents, tools and constraints
pub fn identity_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Stable slug for graph node ids
pub fn slugify(name: &str) -> String {
    static NON_ALNUM: OnceLock<Regex> = OnceLock::new();
    let re = NON_ALNUM.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("static regex"));
    let lower = name.trim().to_lowercase();
    re.replace_all(&lower, "_").trim_matches('_').to_string()
}
