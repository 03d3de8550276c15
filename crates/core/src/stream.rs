//! The streaming half of the Handler Output sum type (§9, "Streaming as a sum-type
//! return").
//!
//! A chunk is left as an opaque `serde_json::Value` rather than a closed enum: the
//! shape of a UI-message chunk (text-delta parts, tool-call parts, the transient
//! `data-trace` part from §4.6) is a front-end concern the core does not need to parse,
//! only forward.

use agentflow_types::Event;
use futures_util::stream::{self, BoxStream, StreamExt};
use serde_json::{Value, json};

pub type UiMessageChunk = Value;

/// A streaming handler result: an opaque chunk stream the executor forwards directly to
/// the caller without inspecting or buffering it (§4.4 step 3e).
pub struct Response {
    pub stream: BoxStream<'static, UiMessageChunk>,
}

impl Response {
    pub fn new(stream: BoxStream<'static, UiMessageChunk>) -> Self {
        Self { stream }
    }

    /// Wraps a model's chunk stream, prepending a transient trace data-part when the
    /// context has observability enabled and at least one event recorded (§4.6,
    /// "Observability interaction"). When `trace` is empty or `None`, the model stream
    /// passes through untouched.
    pub fn with_trace_prefix(trace: Option<&[Event]>, model_stream: BoxStream<'static, UiMessageChunk>) -> Self {
        let Some(events) = trace.filter(|events| !events.is_empty()) else {
            return Self::new(model_stream);
        };

        let trace_part = json!({
            "type": "data-trace",
            "id": "data-trace",
            "data": { "events": events },
            "transient": true,
        });

        let stream = stream::once(async move { trace_part }).chain(model_stream).boxed();
        Self::new(stream)
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response").field("stream", &"<opaque>").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream::once;

    #[tokio::test]
    async fn without_trace_the_model_stream_passes_through_unchanged() {
        let model_stream = once(async { json!({"type": "text-delta", "delta": "hi"}) }).boxed();
        let response = Response::with_trace_prefix(None, model_stream);
        let chunks: Vec<Value> = response.stream.collect().await;
        assert_eq!(chunks, vec![json!({"type": "text-delta", "delta": "hi"})]);
    }

    #[tokio::test]
    async fn with_trace_the_data_trace_part_is_prepended_and_transient() {
        let model_stream = once(async { json!({"type": "text-delta", "delta": "hi"}) }).boxed();
        let events = vec![];
        let response = Response::with_trace_prefix(Some(&events), model_stream);
        let chunks: Vec<Value> = response.stream.collect().await;
        // empty trace => no prefix
        assert_eq!(chunks.len(), 1);
    }
}
