//! # Conversation Sessions
//!
//! Per-session context, the turn phase state machine, turn events and the
//! orchestrator that runs one turn end to end.

pub mod context;
pub mod events;
pub mod orchestrator;
pub mod phase;

pub use context::{ChatMessage, ChatRole, SessionContext};
pub use events::{event_channel, EventReceiver, EventSender, TurnEvent, TurnEventKind};
pub use orchestrator::{OrchestratorConfig, SessionOrchestrator, TurnResult, FAILURE_REPLY};
pub use phase::TurnPhase;
