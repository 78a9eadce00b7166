//! # Session Orchestrator
//!
//! Sequences one conversational turn:
//!
//! ```text
//! message → extract (oracle, timeout) → merge → check → project → reply
//! ```
//!
//! The session context is committed only once every stage has produced its
//! value. On extraction failure the previous specification, graph and phase
//! are kept and the user gets an apology.

use super::context::SessionContext;
use super::events::{EventSender, TurnEvent, TurnEventKind};
use super::phase::TurnPhase;
use crate::graph::{project, TopologyGraph};
use crate::skills::{build_request, extract, SpecOracle};
use crate::state::{check, merge, render_summary, SpecChange, SpecDocument, SpecIssue};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

pub const FAILURE_REPLY: &str =
    "Sorry, I couldn't process that message. Your specification is unchanged; could you try again?";

/// Tunables for turn processing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Upper bound on one oracle call
    pub extraction_timeout_secs: u64,
    /// History messages shown to the oracle
    pub history_window: usize,
    /// Append the top issue's question when the reply asks nothing
    pub append_clarifying_question: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            extraction_timeout_secs: 30,
            history_window: 6,
            append_clarifying_question: true,
        }
    }
}

impl OrchestratorConfig {
    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction_timeout_secs)
    }
}

/// Everything the presentation layer needs after a turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResult {
    pub reply: String,
    pub graph: TopologyGraph,
    pub specification: SpecDocument,
    /// Markdown digest
    pub summary: String,
    pub phase: TurnPhase,
    pub issues: Vec<SpecIssue>,
    pub changes: Vec<SpecChange>,
    pub extraction_failed: bool,
    /// Patch fields dropped during validation
    #[serde(default)]
    pub discarded_fields: Vec<String>,
}

pub struct SessionOrchestrator {
    oracle: Arc<dyn SpecOracle>,
    config: OrchestratorConfig,
    event_tx: Option<EventSender>,
}

impl SessionOrchestrator {
    pub fn new(oracle: Arc<dyn SpecOracle>) -> Self {
        Self {
            oracle,
            config: OrchestratorConfig::default(),
            event_tx: None,
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set event channel for streaming turn events
    pub fn with_event_channel(mut self, tx: EventSender) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    fn emit(&self, event: TurnEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }

    /// Process one user message against the session
    #[tracing::instrument(skip(self, ctx, message), fields(session = %ctx.id, turn = ctx.turns + 1))]
    pub async fn process_turn(&self, ctx: &mut SessionContext, message: &str) -> TurnResult {
        let message = message.trim();
        self.emit(
            TurnEvent::new(TurnEventKind::TurnStarted, &ctx.id)
                .with_data(json!({ "message": message })),
        );

        if message.is_empty() {
            return self.clarify_blank(ctx);
        }

        let request = build_request(
            &ctx.history,
            message,
            &ctx.specification,
            self.config.history_window,
        );
        let timeout = self.config.extraction_timeout();

        let extraction = match extract(self.oracle.as_ref(), &request, timeout).await {
            Ok(extraction) => extraction,
            Err(err) => {
                tracing::warn!(oracle = self.oracle.name(), error = %err, "Extraction failed; keeping previous specification");
                self.emit(
                    TurnEvent::new(TurnEventKind::ExtractionFailed, &ctx.id)
                        .with_data(json!({ "error": err.to_string() })),
                );
                let reply = FAILURE_REPLY.to_string();
                ctx.record_exchange(message, &reply);
                let issues = check(&ctx.specification);
                return TurnResult {
                    reply,
                    graph: ctx.graph.clone(),
                    specification: ctx.specification.clone(),
                    summary: render_summary(&ctx.specification, &issues),
                    phase: ctx.phase,
                    issues,
                    changes: Vec::new(),
                    extraction_failed: true,
                    discarded_fields: Vec::new(),
                };
            }
        };
        self.emit(TurnEvent::new(TurnEventKind::ExtractionCompleted, &ctx.id));

        let discarded_fields = extraction.validation.rejected_fields();
        if !discarded_fields.is_empty() {
            self.emit(
                TurnEvent::new(TurnEventKind::PatchFieldsDiscarded, &ctx.id)
                    .with_data(json!({ "fields": discarded_fields })),
            );
        }

        let outcome = merge(&ctx.specification, &extraction.validation.patch);
        if !outcome.changes.is_empty() {
            self.emit(
                TurnEvent::new(TurnEventKind::SpecificationMerged, &ctx.id)
                    .with_data(json!({ "changes": outcome.changes })),
            );
        }

        let issues = check(&outcome.document);
        let phase = TurnPhase::from_issues(&issues);
        let graph = project(&outcome.document);
        let summary = render_summary(&outcome.document, &issues);
        let reply = self.shape_reply(&extraction.reply, phase, &issues, &summary);

        match issues.first() {
            Some(issue) => self.emit(
                TurnEvent::new(TurnEventKind::ClarificationRequested, &ctx.id).with_data(json!({
                    "category": issue.category,
                    "question": issue.question,
                    "open_issues": issues.len(),
                })),
            ),
            None => self.emit(TurnEvent::new(TurnEventKind::SpecificationSummarized, &ctx.id)),
        }

        if phase != ctx.phase {
            tracing::info!(from = %ctx.phase, to = %phase, "Turn phase changed");
        }
        tracing::info!(
            changes = outcome.changes.len(),
            issues = issues.len(),
            agents = outcome.document.agents.len(),
            "Turn processed"
        );

        ctx.specification = outcome.document;
        ctx.graph = graph;
        ctx.phase = phase;
        ctx.record_exchange(message, &reply);

        TurnResult {
            reply,
            graph: ctx.graph.clone(),
            specification: ctx.specification.clone(),
            summary,
            phase,
            issues,
            changes: outcome.changes,
            extraction_failed: false,
            discarded_fields,
        }
    }

    fn shape_reply(&self, reply: &str, phase: TurnPhase, issues: &[SpecIssue], summary: &str) -> String {
        match phase {
            TurnPhase::Collecting => match issues.first() {
                Some(issue) if self.config.append_clarifying_question && !reply.contains('?') => {
                    format!("{} {}", reply, issue.question)
                }
                _ => reply.to_string(),
            },
            TurnPhase::Summarizing if reply.contains('?') => summary.to_string(),
            TurnPhase::Summarizing => format!("{}\n\n{}", reply, summary),
        }
    }

    /// Blank input: ask again without calling the oracle or touching history
    fn clarify_blank(&self, ctx: &SessionContext) -> TurnResult {
        let issues = check(&ctx.specification);
        let reply = match issues.first() {
            Some(issue) => format!("I didn't catch that. {}", issue.question),
            None => "I didn't catch that. What would you like to change?".to_string(),
        };
        self.emit(
            TurnEvent::new(TurnEventKind::ClarificationRequested, &ctx.id)
                .with_data(json!({ "reason": "empty_message" })),
        );
        TurnResult {
            reply,
            graph: ctx.graph.clone(),
            specification: ctx.specification.clone(),
            summary: render_summary(&ctx.specification, &issues),
            phase: ctx.phase,
            issues,
            changes: Vec::new(),
            extraction_failed: false,
            discarded_fields: Vec::new(),
        }
    }
}
