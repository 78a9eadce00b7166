//! # Extraction Skills
//!
//! The extraction step of a turn and the oracles behind it.
//!
//! ```text
//! SessionOrchestrator
//!   └── extract() ── timeout ──► dyn SpecOracle
//!                                  ├── LlmSpecOracle (radkit LlmFunction)
//!                                  └── ScriptedOracle (queued answers)
//! ```

pub mod extraction;
pub mod extraction_skill;
pub mod llm_helpers;
pub mod oracle;
pub mod prompts;
pub mod scripted;

pub use extraction::{build_request, compose_reply, extract, render_prompt, Extraction, FALLBACK_REPLY};
pub use extraction_skill::{ExtractionOutput, LlmSpecOracle};
pub use oracle::{OracleRequest, OracleResponse, SpecOracle};
pub use scripted::{parse_model_output, ScriptedOracle, ScriptedReply};
