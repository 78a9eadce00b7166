//! # Engine Errors
//!
//! Typed failures raised inside the specification engine. None of these are
//! allowed to end a session: the orchestrator recovers every variant locally
//! and answers the user with the previous specification.

use thiserror::Error;

/// Failure of the extraction oracle for one turn.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    /// The LLM backend could not be reached or returned an error
    #[error("extraction backend failed: {0}")]
    Backend(String),

    /// The backend did not answer within the configured bound
    #[error("extraction timed out after {0}ms")]
    Timeout(u64),

    /// The backend answered with something that is not a usable patch
    #[error("unparsable extraction output: {0}")]
    Unparsable(String),

    /// A scripted oracle ran out of queued responses
    #[error("scripted oracle has no responses left")]
    ScriptExhausted,
}

/// Engine-level error kinds surfaced to observers of a turn.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SpecError {
    /// Backend unreachable, timed out, or unparsable
    #[error("extraction failure: {0}")]
    ExtractionFailure(#[from] ExtractionError),

    /// Reserved for structured conflict detection; the union/overwrite policy
    /// currently resolves every conflict.
    #[error("merge conflict on `{field}`: {reason}")]
    MergeConflict { field: String, reason: String },

    /// The patch referenced unknown fields or used an unusable shape
    #[error("invalid patch shape at `{field}`: {reason}")]
    InvalidPatchShape { field: String, reason: String },
}

impl SpecError {
    /// Short machine-readable tag, used in turn events
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ExtractionFailure(_) => "extraction_failure",
            Self::MergeConflict { .. } => "merge_conflict",
            Self::InvalidPatchShape { .. } => "invalid_patch_shape",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_error_converts() {
        let err: SpecError = ExtractionError::Timeout(30_000).into();
        assert_eq!(err.kind(), "extraction_failure");
        assert!(err.to_string().contains("30000ms"));
    }

    #[test]
    fn test_invalid_shape_message() {
        let err = SpecError::InvalidPatchShape {
            field: "budget".to_string(),
            reason: "unknown field".to_string(),
        };
        assert_eq!(err.kind(), "invalid_patch_shape");
        assert_eq!(err.to_string(), "invalid patch shape at `budget`: unknown field");
    }
}
