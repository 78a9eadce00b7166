//! # Turn Phase
//!
//! Two-state machine driven by the completeness check. There is no terminal
//! state: a later correction can always reopen `collecting`.
//!
//! ```text
//!            issues == []
//! Collecting ────────────► Summarizing
//!      ▲                        │
//!      └──── issues != [] ──────┘
//! ```

use crate::state::SpecIssue;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    /// Issues remain; the reply asks a clarifying question
    #[default]
    Collecting,
    /// No issues; the reply is a specification digest
    Summarizing,
}

impl TurnPhase {
    /// Phase implied by a completeness check
    pub fn from_issues(issues: &[SpecIssue]) -> Self {
        if issues.is_empty() {
            Self::Summarizing
        } else {
            Self::Collecting
        }
    }

    /// Move to the phase implied by `issues`; returns true when it changed
    pub fn advance(&mut self, issues: &[SpecIssue]) -> bool {
        let next = Self::from_issues(issues);
        let changed = next != *self;
        *self = next;
        changed
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Collecting => "collecting",
            Self::Summarizing => "summarizing",
        }
    }
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{check, AgentSpec, SpecDocument};

    #[test]
    fn test_empty_document_collects() {
        let issues = check(&SpecDocument::default());
        assert_eq!(TurnPhase::from_issues(&issues), TurnPhase::Collecting);
    }

    #[test]
    fn test_summarizing_can_reopen() {
        let mut phase = TurnPhase::Collecting;
        assert!(phase.advance(&[]));
        assert_eq!(phase, TurnPhase::Summarizing);

        // a new agent without a topology reopens the conversation
        let doc = SpecDocument {
            agents: vec![AgentSpec::new("A")],
            ..SpecDocument::default()
        };
        assert!(phase.advance(&check(&doc)));
        assert_eq!(phase, TurnPhase::Collecting);
        assert!(!phase.advance(&check(&doc)));
    }
}
