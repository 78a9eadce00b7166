//! # MasForge Core
//!
//! The specification-state engine: turns a conversation about a multi-agent
//! system into a structured specification and a topology graph.
//!
//! ## Architecture
//!
//! - `state/` - Specification document, patch validation, merge, completeness, summary
//! - `graph/` - Topology graph projection and Mermaid rendering
//! - `skills/` - Extraction oracles (LLM-backed and scripted) and the extraction step
//! - `session/` - Session context, turn phases, events and the orchestrator
//! - `models` - LLM provider configuration
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use masforge_core::models::ModelConfig;
//! use masforge_core::session::{SessionContext, SessionOrchestrator};
//! use masforge_core::skills::LlmSpecOracle;
//!
//! let oracle = Arc::new(LlmSpecOracle::new(ModelConfig::from_env()?));
//! let orchestrator = SessionOrchestrator::new(oracle);
//! let mut session = SessionContext::new();
//! let turn = orchestrator.process_turn(&mut session, "Build a research team").await;
//! println!("{}", turn.reply);
//! ```

pub mod error;
pub mod graph;
pub mod models;
pub mod session;
pub mod skills;
pub mod state;

pub use error::{ExtractionError, SpecError};
