//! The unit of incoming event data.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An event as delivered by the transport: a type tag plus the raw GitHub
/// webhook payload.
///
/// ```
/// use triage_agent::webhooks::EventEnvelope;
///
/// let raw = r#"{"eventType":"issues","payload":{"action":"opened"}}"#;
/// let envelope = EventEnvelope::parse(raw).unwrap();
/// assert_eq!(envelope.event_type, "issues");
/// assert_eq!(envelope.action(), Some("opened"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(rename = "eventType")]
    pub event_type: String,

    #[serde(default)]
    pub payload: Value,
}

impl EventEnvelope {
    pub fn new(event_type: impl Into<String>, payload: Value) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
        }
    }

    /// Parses one raw transport message.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// The payload's `action`, if it has one.
    pub fn action(&self) -> Option<&str> {
        self.payload.get("action")?.as_str()
    }

    /// Whether the payload describes a merged pull request.
    ///
    /// A missing or non-boolean `merged` field counts as not merged.
    pub fn is_merged_pull_request(&self) -> bool {
        self.payload
            .get("pull_request")
            .and_then(|pr| pr.get("merged"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}
