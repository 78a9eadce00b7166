//! # Scripted Oracle
//!
//! Deterministic oracle that replays queued answers in order. Used by tests
//! and by `masforge chat --script`. Raw answers are parsed like model output:
//! Markdown fences are stripped before JSON parsing.

use super::oracle::{OracleRequest, OracleResponse, SpecOracle};
use crate::error::ExtractionError;
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Mutex, OnceLock};

/// One queued answer
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Response(OracleResponse),
    /// Model-style text, parsed when replayed
    Raw(String),
    Fail(ExtractionError),
    /// Never answers; exercises the extraction timeout
    Hang,
}

#[derive(Debug, Default)]
pub struct ScriptedOracle {
    script: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<OracleRequest>>,
}

impl ScriptedOracle {
    pub fn new(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            script: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// One raw answer per non-blank line; `#` starts a comment line
    pub fn from_lines(text: &str) -> Self {
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(|l| ScriptedReply::Raw(l.to_string())),
        )
    }

    pub fn push(&self, reply: ScriptedReply) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(reply);
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Requests seen so far, oldest first
    pub fn requests(&self) -> Vec<OracleRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SpecOracle for ScriptedOracle {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn respond(&self, request: &OracleRequest) -> Result<OracleResponse, ExtractionError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let next = self
            .script
            .lock()
            .map_err(|e| ExtractionError::Backend(e.to_string()))?
            .pop_front();

        match next {
            None => Err(ExtractionError::ScriptExhausted),
            Some(ScriptedReply::Response(response)) => Ok(response),
            Some(ScriptedReply::Raw(text)) => parse_model_output(&text),
            Some(ScriptedReply::Fail(err)) => Err(err),
            Some(ScriptedReply::Hang) => std::future::pending().await,
        }
    }
}

fn strip_fences(raw: &str) -> &str {
    static FENCED: OnceLock<Regex> = OnceLock::new();
    let re = FENCED.get_or_init(|| Regex::new(r"(?s)```(?:json)?(.*?)```").expect("static regex"));
    match re.captures(raw).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => raw.trim().trim_start_matches("```json").trim_matches('`').trim(),
    }
}

fn optional_text(object: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Parse model-style JSON text (optionally fenced) into a response
pub fn parse_model_output(raw: &str) -> Result<OracleResponse, ExtractionError> {
    let body = strip_fences(raw);
    let value: Value = serde_json::from_str(body).map_err(|e| {
        ExtractionError::Unparsable(format!("{} in {:?}", e, truncate(body, 80)))
    })?;
    let Value::Object(object) = value else {
        return Err(ExtractionError::Unparsable(
            "expected a JSON object".to_string(),
        ));
    };

    Ok(OracleResponse {
        updated_fields: object.get("updated_fields").cloned().unwrap_or(Value::Null),
        reply: optional_text(&object, "reply"),
        follow_up_question: optional_text(&object, "follow_up_question"),
    })
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_fenced_output() {
        let raw = "```json\n{\"updated_fields\": {\"task\": \"x\"}, \"reply\": \"ok\"}\n```";
        let response = parse_model_output(raw).unwrap();
        assert_eq!(response.updated_fields, json!({"task": "x"}));
        assert_eq!(response.reply.as_deref(), Some("ok"));
        assert!(response.follow_up_question.is_none());
    }

    #[test]
    fn test_parse_embedded_fence() {
        let raw = "Here you go:\n```\n{\"reply\": \"hi\", \"follow_up_question\": \" \"}\n```\nThanks";
        let response = parse_model_output(raw).unwrap();
        assert_eq!(response.reply.as_deref(), Some("hi"));
        assert!(response.follow_up_question.is_none());
        assert_eq!(response.updated_fields, Value::Null);
    }

    #[test]
    fn test_parse_garbage_is_unparsable() {
        assert!(matches!(
            parse_model_output("I think you want three agents"),
            Err(ExtractionError::Unparsable(_))
        ));
        assert!(matches!(
            parse_model_output("[1, 2]"),
            Err(ExtractionError::Unparsable(_))
        ));
    }

    #[tokio::test]
    async fn test_replays_in_order_then_exhausts() {
        let oracle = ScriptedOracle::from_lines(
            "# comment\n{\"reply\": \"first\"}\n\nnot json\n",
        );
        assert_eq!(oracle.remaining(), 2);
        let request = OracleRequest::default();

        let first = oracle.respond(&request).await.unwrap();
        assert_eq!(first.reply.as_deref(), Some("first"));
        assert!(matches!(
            oracle.respond(&request).await,
            Err(ExtractionError::Unparsable(_))
        ));
        assert_eq!(
            oracle.respond(&request).await,
            Err(ExtractionError::ScriptExhausted)
        );
        assert_eq!(oracle.requests().len(), 3);
    }
}
