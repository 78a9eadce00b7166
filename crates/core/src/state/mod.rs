//! # Specification State
//!
//! The specification document, its schema and vocabulary, and the pure
//! operations over it: patch validation, merge, completeness check, summary.

pub mod completeness;
pub mod document;
pub mod merge;
pub mod patch;
pub mod schema;
pub mod summary;
pub mod vocabulary;

pub use completeness::{check, is_complete, suggestions, IssueCategory, SpecIssue};
pub use document::{AgentSpec, SpecDocument};
pub use merge::{merge, MergeOutcome, SpecChange};
pub use patch::{PatchValidation, Retraction, SpecPatch};
pub use schema::{missing_required_fields, schema_summary, FieldSpec, FieldType, SPEC_FIELDS};
pub use summary::render_summary;
pub use vocabulary::{CommunicationStyle, TopologyPattern};
