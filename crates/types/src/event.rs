//! Sanitized observability event model.
//!
//! Events never carry payloads, resolved references, prompts, tool arguments, or raw
//! error messages (§4.4 step 3f, §7). The field set is intentionally closed.

use serde::{Deserialize, Serialize};

/// A single lifecycle event for one workflow step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    #[serde(rename = "step-start")]
    Start {
        #[serde(flatten)]
        meta: StepMeta,
        timestamp: i64,
    },
    #[serde(rename = "step-complete")]
    Complete {
        #[serde(flatten)]
        meta: StepMeta,
        timestamp: i64,
        duration_ms: u64,
    },
    #[serde(rename = "step-error")]
    Error {
        #[serde(flatten)]
        meta: StepMeta,
        timestamp: i64,
        duration_ms: u64,
        error_kind: ErrorKind,
    },
}

/// Fields shared by every event variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepMeta {
    pub step_id: String,
    pub step_type: String,
    pub step_index: usize,
    pub total_steps: usize,
}

/// Sanitized error classification used in `step-error` events (§7).
///
/// Never derived from, nor reconstructible into, the original error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Timeout,
    AuthFailed,
    Validation,
    Network,
    Unknown,
}

impl Event {
    pub fn step_id(&self) -> &str {
        match self {
            Event::Start { meta, .. } | Event::Complete { meta, .. } | Event::Error { meta, .. } => &meta.step_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serializes_with_tagged_type_field() {
        let event = Event::Start {
            meta: StepMeta {
                step_id: "s1".into(),
                step_type: "llm".into(),
                step_index: 0,
                total_steps: 2,
            },
            timestamp: 0,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "step-start");
        assert_eq!(value["step_id"], "s1");
        assert_eq!(value["step_index"], 0);
    }

    #[test]
    fn error_event_carries_only_classified_kind() {
        let event = Event::Error {
            meta: StepMeta {
                step_id: "s1".into(),
                step_type: "llm".into(),
                step_index: 0,
                total_steps: 1,
            },
            timestamp: 0,
            duration_ms: 12,
            error_kind: ErrorKind::Network,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["error_kind"], "network");
        assert!(value.get("message").is_none());
    }
}
