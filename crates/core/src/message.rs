//! The two message shapes used by the LLM-facing primitives (§9, "Two message shapes").
//!
//! `llm` (§4.5) passes its resolved `messages` straight through to the provider in
//! whatever shape the author wrote — the core does not understand it. `chat` (§4.6) is
//! different: it accepts UI-message shape (structured `parts`, as an interactive
//! front-end would send) and must convert to model-message shape (flat `content`)
//! before invoking the provider. That conversion is `chat`'s definitional difference
//! from `llm`, so the two message shapes are modeled as distinct nominal types with an
//! explicit, injectable converter rather than one type with optional fields — see §9.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A message in UI-message shape: content broken into typed parts, the representation
/// an interactive chat front-end naturally produces and consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiMessage {
    pub role: String,
    #[serde(default)]
    pub parts: Vec<UiMessagePart>,
}

/// One part of a [`UiMessage`]. Only the `text` variant is interpreted by the default
/// converter; other kinds pass through `raw` untouched so a custom converter can handle
/// them (file attachments, tool-call parts supplied by a richer front-end, etc.).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UiMessagePart {
    Text { text: String },
    #[serde(other)]
    Other,
}

/// A message in model-message shape: flat `content`, the representation providers'
/// chat-completion APIs expect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMessage {
    pub role: String,
    pub content: String,
}

/// Converts UI-message shape into model-message shape.
///
/// Exposed as a free function (rather than buried inside the `chat` primitive) so
/// non-Web embedding targets can supply their own converter for parts this default
/// implementation doesn't understand — see §9, "expose the converter as an injectable
/// seam".
pub fn ui_messages_to_model_messages(messages: &[UiMessage]) -> Vec<ModelMessage> {
    messages
        .iter()
        .map(|message| ModelMessage {
            role: message.role.clone(),
            content: message
                .parts
                .iter()
                .filter_map(|part| match part {
                    UiMessagePart::Text { text } => Some(text.as_str()),
                    UiMessagePart::Other => None,
                })
                .collect::<Vec<_>>()
                .join(""),
        })
        .collect()
}

/// Parses a resolved `messages` JSON value as UI-message shape.
///
/// Used by `chat`; `llm` never calls this; it forwards the resolved `Value` as-is.
pub fn parse_ui_messages(value: &Value) -> anyhow::Result<Vec<UiMessage>> {
    Ok(serde_json::from_value(value.clone())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_text_parts_to_flat_content() {
        let messages = vec![UiMessage {
            role: "user".into(),
            parts: vec![UiMessagePart::Text { text: "hi".into() }, UiMessagePart::Text { text: " there".into() }],
        }];
        let converted = ui_messages_to_model_messages(&messages);
        assert_eq!(converted[0].role, "user");
        assert_eq!(converted[0].content, "hi there");
    }

    #[test]
    fn parses_ui_message_shape_from_json() {
        let value = json!([{"role": "user", "parts": [{"type": "text", "text": "hello"}]}]);
        let messages = parse_ui_messages(&value).expect("parse");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, "user");
    }

    #[test]
    fn unknown_part_kinds_are_dropped_by_default_converter() {
        let value = json!([{"role": "user", "parts": [{"type": "file", "url": "x"}]}]);
        let messages = parse_ui_messages(&value).expect("parse");
        let converted = ui_messages_to_model_messages(&messages);
        assert_eq!(converted[0].content, "");
    }
}
