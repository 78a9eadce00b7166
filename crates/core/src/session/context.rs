//! # Session Context
//!
//! The only mutable state of a conversation: history, specification, the
//! last projected graph and the turn phase. One value per session, passed
//! explicitly into every turn.

use super::phase::TurnPhase;
use crate::graph::TopologyGraph;
use crate::state::{check, render_summary, SpecDocument, SpecIssue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    /// Speaker label used in prompts
    pub fn label(&self) -> &'static str {
        match self {
            ChatRole::User => "User",
            ChatRole::Assistant => "Assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    /// UUID v4
    pub id: String,
    pub history: Vec<ChatMessage>,
    pub specification: SpecDocument,
    /// Graph of `specification` as of the last turn
    pub graph: TopologyGraph,
    pub phase: TurnPhase,
    /// Completed turns, failed ones included
    pub turns: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    /// Fresh session with an empty specification
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            history: Vec::new(),
            specification: SpecDocument::new(),
            graph: TopologyGraph::default(),
            phase: TurnPhase::Collecting,
            turns: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn issues(&self) -> Vec<SpecIssue> {
        check(&self.specification)
    }

    pub fn summary(&self) -> String {
        render_summary(&self.specification, &self.issues())
    }

    /// Append one user/assistant exchange
    pub(crate) fn record_exchange(&mut self, user: &str, assistant: &str) {
        self.history.push(ChatMessage::new(ChatRole::User, user));
        self.history.push(ChatMessage::new(ChatRole::Assistant, assistant));
        self.turns += 1;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_starts_collecting() {
        let ctx = SessionContext::new();
        assert_eq!(ctx.phase, TurnPhase::Collecting);
        assert!(ctx.specification.is_empty());
        assert!(Uuid::parse_str(&ctx.id).is_ok());
        assert_ne!(ctx.id, SessionContext::new().id);
    }

    #[test]
    fn test_record_exchange() {
        let mut ctx = SessionContext::new();
        ctx.record_exchange("hi", "hello");
        assert_eq!(ctx.turns, 1);
        assert_eq!(ctx.history.len(), 2);
        assert_eq!(ctx.history[0].role, ChatRole::User);
        assert_eq!(ctx.history[1].content, "hello");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_value(ChatMessage::new(ChatRole::Assistant, "x")).unwrap();
        assert_eq!(json["role"], "assistant");
    }
}
