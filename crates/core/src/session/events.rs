//! # Turn Events
//!
//! Observability stream for turns. Emission is fire-and-forget on an
//! unbounded `tokio::sync::mpsc` channel; a closed receiver never affects a turn.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TurnEventKind {
    TurnStarted,
    ExtractionCompleted,
    /// Backend error, timeout or unparsable output; the turn kept the old state
    ExtractionFailed,
    /// Unknown or malformed patch fields were dropped
    PatchFieldsDiscarded,
    SpecificationMerged,
    ClarificationRequested,
    SpecificationSummarized,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnEvent {
    pub id: String,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: TurnEventKind,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl TurnEvent {
    pub fn new(kind: TurnEventKind, session_id: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            timestamp: Utc::now(),
            kind,
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

pub type EventSender = mpsc::UnboundedSender<TurnEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<TurnEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_creation() {
        let event = TurnEvent::new(TurnEventKind::PatchFieldsDiscarded, "s-1")
            .with_data(json!({"fields": ["budget"]}));
        assert_eq!(event.session_id, "s-1");
        assert_eq!(event.data.unwrap()["fields"][0], "budget");
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_value(TurnEventKind::SpecificationSummarized).unwrap();
        assert_eq!(json, "specification_summarized");
    }
}
