//! # Extraction Function
//!
//! One oracle call per turn, bounded by a timeout, followed by validation of
//! the untrusted patch and the reply fallback rules. Inputs are borrowed and
//! never modified.

use super::oracle::{OracleRequest, SpecOracle};
use crate::error::ExtractionError;
use crate::session::ChatMessage;
use crate::state::{
    missing_required_fields, schema_summary, suggestions, PatchValidation, SpecDocument, SpecPatch,
};
use std::time::Duration;

/// Reply used when the oracle offers neither a reply nor a question
pub const FALLBACK_REPLY: &str = "Could you clarify what you want next?";

/// Validated result of one extraction
#[derive(Debug, Clone)]
pub struct Extraction {
    pub validation: PatchValidation,
    pub reply: String,
}

/// Snapshot the inputs the oracle is allowed to see
pub fn build_request(
    history: &[ChatMessage],
    message: &str,
    specification: &SpecDocument,
    history_window: usize,
) -> OracleRequest {
    let start = history.len().saturating_sub(history_window);
    OracleRequest {
        history: history[start..].to_vec(),
        message: message.to_string(),
        specification: specification.clone(),
        missing_required: missing_required_fields(specification)
            .into_iter()
            .map(str::to_string)
            .collect(),
        suggestions: suggestions(specification),
    }
}

/// Render the user prompt for an LLM-backed oracle
pub fn render_prompt(request: &OracleRequest) -> String {
    let spec_json = serde_json::to_string_pretty(&request.specification)
        .unwrap_or_else(|_| "{}".to_string());
    let missing = if request.missing_required.is_empty() {
        "(none)".to_string()
    } else {
        request.missing_required.join(", ")
    };
    let hints = if request.suggestions.is_empty() {
        "(none)".to_string()
    } else {
        request
            .suggestions
            .iter()
            .map(|s| format!("- {}", s))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let history = request
        .history
        .iter()
        .map(|m| format!("{}: {}", m.role.label(), m.content))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "## SCHEMA YOU MUST FOLLOW\n{}\n\n## CURRENT SPEC\n{}\n\n## MISSING REQUIRED\n{}\n\n\
         ## PROACTIVE SUGGESTIONS\n{}\n\n## CONVERSATION HISTORY\n{}\n\n## USER MESSAGE\n{}\n",
        schema_summary(),
        spec_json,
        missing,
        hints,
        if history.is_empty() { "(start of conversation)" } else { history.as_str() },
        request.message
    )
}

/// Reply, else follow-up, else the fallback; a distinct follow-up is appended
pub fn compose_reply(reply: Option<&str>, follow_up: Option<&str>) -> String {
    let reply = reply.map(str::trim).filter(|r| !r.is_empty());
    let follow_up = follow_up.map(str::trim).filter(|q| !q.is_empty());
    match (reply, follow_up) {
        (Some(reply), Some(question)) if !reply.contains(question) => {
            format!("{} {}", reply, question)
        }
        (Some(reply), _) => reply.to_string(),
        (None, Some(question)) => question.to_string(),
        (None, None) => FALLBACK_REPLY.to_string(),
    }
}

/// Ask the oracle, bounded by `timeout`, and validate what comes back
pub async fn extract(
    oracle: &dyn SpecOracle,
    request: &OracleRequest,
    timeout: Duration,
) -> Result<Extraction, ExtractionError> {
    let response = match tokio::time::timeout(timeout, oracle.respond(request)).await {
        Ok(result) => result?,
        Err(_) => return Err(ExtractionError::Timeout(timeout.as_millis() as u64)),
    };
    tracing::debug!(oracle = oracle.name(), fields = %response.updated_fields, "Oracle answered");

    let validation = SpecPatch::from_untrusted(&response.updated_fields);
    let reply = compose_reply(
        response.reply.as_deref(),
        response.follow_up_question.as_deref(),
    );
    Ok(Extraction { validation, reply })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ChatRole;
    use crate::skills::oracle::OracleResponse;
    use crate::skills::scripted::{ScriptedOracle, ScriptedReply};
    use serde_json::json;

    #[test]
    fn test_reply_fallback_rules() {
        assert_eq!(compose_reply(Some("Great."), None), "Great.");
        assert_eq!(compose_reply(None, Some("Which agents?")), "Which agents?");
        assert_eq!(compose_reply(Some(" "), Some(" ")), FALLBACK_REPLY);
        assert_eq!(
            compose_reply(Some("Noted."), Some("Which topology?")),
            "Noted. Which topology?"
        );
        assert_eq!(
            compose_reply(Some("Noted. Which topology?"), Some("Which topology?")),
            "Noted. Which topology?"
        );
    }

    #[test]
    fn test_request_windows_history() {
        let history: Vec<ChatMessage> = (0..10)
            .map(|i| ChatMessage::new(ChatRole::User, format!("m{}", i)))
            .collect();
        let request = build_request(&history, "latest", &SpecDocument::default(), 6);
        assert_eq!(request.history.len(), 6);
        assert_eq!(request.history[0].content, "m4");
        assert_eq!(
            request.missing_required,
            vec!["task", "agents", "communication", "topology"]
        );
    }

    #[test]
    fn test_prompt_contains_every_section() {
        let history = vec![ChatMessage::new(ChatRole::Assistant, "Hello!")];
        let request = build_request(&history, "Add a critic agent", &SpecDocument::default(), 6);
        let prompt = render_prompt(&request);
        for needle in [
            "SCHEMA YOU MUST FOLLOW",
            "CURRENT SPEC",
            "MISSING REQUIRED",
            "task, agents, communication, topology",
            "Assistant: Hello!",
            "USER MESSAGE\nAdd a critic agent",
        ] {
            assert!(prompt.contains(needle), "prompt lacks {:?}", needle);
        }
    }

    #[tokio::test]
    async fn test_extract_validates_patch() {
        let oracle = ScriptedOracle::new([ScriptedReply::Response(
            OracleResponse::new(json!({"task": "Triage", "colour": "blue"}), "Got it.")
                .with_follow_up("Which agents?"),
        )]);
        let request = build_request(&[], "triage bot", &SpecDocument::default(), 6);
        let extraction = extract(&oracle, &request, Duration::from_secs(1)).await.unwrap();
        assert_eq!(extraction.validation.patch.task.as_deref(), Some("Triage"));
        assert_eq!(extraction.validation.rejected_fields(), vec!["colour".to_string()]);
        assert_eq!(extraction.reply, "Got it. Which agents?");
    }

    #[tokio::test]
    async fn test_extract_times_out() {
        let oracle = ScriptedOracle::new([ScriptedReply::Hang]);
        let request = OracleRequest::default();
        let err = extract(&oracle, &request, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert_eq!(err, ExtractionError::Timeout(20));
    }
}
