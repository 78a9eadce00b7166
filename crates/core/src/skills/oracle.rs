//! # Specification Oracle
//!
//! The pluggable inference capability behind the extraction step. An oracle
//! reads the conversation and the current specification and answers with an
//! untrusted patch plus reply text. Implementations:
//!
//! - [`LlmSpecOracle`](super::extraction_skill::LlmSpecOracle) - radkit-backed
//! - [`ScriptedOracle`](super::scripted::ScriptedOracle) - replays queued answers

use crate::error::ExtractionError;
use crate::session::ChatMessage;
use crate::state::SpecDocument;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Everything an oracle may look at for one turn (a snapshot; oracles cannot
/// reach the session)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OracleRequest {
    /// Most recent history, oldest first, excluding `message`
    pub history: Vec<ChatMessage>,
    pub message: String,
    pub specification: SpecDocument,
    pub missing_required: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Raw oracle answer; `updated_fields` is validated before merge
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OracleResponse {
    #[serde(default)]
    pub updated_fields: Value,
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default)]
    pub follow_up_question: Option<String>,
}

impl OracleResponse {
    pub fn new(updated_fields: Value, reply: impl Into<String>) -> Self {
        Self {
            updated_fields,
            reply: Some(reply.into()),
            follow_up_question: None,
        }
    }

    pub fn with_follow_up(mut self, question: impl Into<String>) -> Self {
        self.follow_up_question = Some(question.into());
        self
    }
}

#[async_trait]
pub trait SpecOracle: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    async fn respond(&self, request: &OracleRequest) -> Result<OracleResponse, ExtractionError>;
}
