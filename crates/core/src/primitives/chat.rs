//! `chat` primitive (C6, §4.6): a streaming generation returned as a pipeline-ending
//! [`Response`].
//!
//! Unlike `llm`, `chat` always converts its resolved `messages` from UI-message shape
//! (structured `parts`) to model-message shape (flat `content`) before invoking the
//! provider — see [`crate::message`]. The conversion is `chat`'s definitional
//! difference from `llm` (§9, "Two message shapes").

use agentflow_types::Context;
use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use serde_json::{Map, Value, json};

use crate::handler::{HandlerOutput, StepHandler};
use crate::message::{parse_ui_messages, ui_messages_to_model_messages};
use crate::model::{Callback, ErrorInfo, FinishInfo, GenerateRequest, ToolSpec, Usage};
use crate::registry;
use crate::resolve::resolve;
use crate::stream::Response;

pub struct ChatHandler;

#[async_trait]
impl StepHandler for ChatHandler {
    async fn call(&self, config: &Map<String, Value>, context: &mut Context) -> anyhow::Result<HandlerOutput> {
        let config_value = Value::Object(config.clone());
        let resolved = resolve(&config_value, context);
        let resolved = resolved.as_object().ok_or_else(|| anyhow::anyhow!("chat config must resolve to a mapping"))?;

        let provider_name = resolved
            .get("provider")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("chat step requires a 'provider' field"))?;
        let provider = registry::provider(provider_name)
            .ok_or_else(|| anyhow::anyhow!("no provider registered under '{provider_name}'"))?;
        let model_config = resolved.get("model").cloned().unwrap_or(Value::Null);
        let model = provider.create_model(&model_config)?;

        let system = resolved.get("system").and_then(Value::as_str).map(str::to_string);
        let messages_value = resolved.get("messages").cloned().unwrap_or(Value::Array(Vec::new()));
        let ui_messages = parse_ui_messages(&messages_value)?;
        let messages = ui_messages_to_model_messages(&ui_messages);

        let tools: Vec<ToolSpec> = match resolved.get("tools").and_then(Value::as_array) {
            Some(names) => names
                .iter()
                .filter_map(Value::as_str)
                .filter_map(|name| registry::tool(name).map(|tool| tool.spec(name)))
                .collect(),
            None => Vec::new(),
        };

        let request = GenerateRequest {
            model: resolved.get("model").and_then(Value::as_str).map(str::to_string),
            system,
            messages,
            tools,
            temperature: resolved.get("temperature").and_then(Value::as_f64),
            max_tokens: resolved.get("maxTokens").and_then(Value::as_u64),
        };

        let on_finish = resolved.get("onFinish").and_then(Value::as_str).and_then(resolve_callback);
        let on_error = resolved.get("onError").and_then(Value::as_str).and_then(resolve_callback);

        let model_stream = model.stream(request).await?;
        let chunk_stream = into_ui_chunk_stream(model_stream, on_finish, on_error).boxed();

        let trace = context.trace.as_deref();
        Ok(HandlerOutput::Response(Response::with_trace_prefix(trace, chunk_stream)))
    }
}

/// Looks up a callback name in the Callback Registry. Names that aren't registered are
/// logged and ignored rather than treated as an error (§4.6).
fn resolve_callback(name: &str) -> Option<std::sync::Arc<dyn Callback>> {
    match registry::callback(name) {
        Some(callback) => Some(callback),
        None => {
            tracing::warn!(callback = name, "chat callback name not found in the callback registry; ignoring");
            None
        }
    }
}

/// Drives the model's event stream into a UI-message chunk stream, invoking
/// `onFinish`/`onError` at the appropriate lifecycle point (§4.6).
fn into_ui_chunk_stream(
    model_stream: futures_util::stream::BoxStream<'static, anyhow::Result<crate::model::StreamEvent>>,
    on_finish: Option<std::sync::Arc<dyn Callback>>,
    on_error: Option<std::sync::Arc<dyn Callback>>,
) -> impl futures_util::Stream<Item = Value> {
    struct State {
        inner: futures_util::stream::BoxStream<'static, anyhow::Result<crate::model::StreamEvent>>,
        text: String,
        usage: Usage,
        on_finish: Option<std::sync::Arc<dyn Callback>>,
        on_error: Option<std::sync::Arc<dyn Callback>>,
        done: bool,
    }

    let state = State { inner: model_stream, text: String::new(), usage: Usage::default(), on_finish, on_error, done: false };

    stream::unfold(state, |mut state| async move {
        if state.done {
            return None;
        }
        match state.inner.next().await {
            Some(Ok(crate::model::StreamEvent::TextDelta(delta))) => {
                state.text.push_str(&delta);
                let chunk = json!({"type": "text-delta", "delta": delta});
                Some((chunk, state))
            }
            Some(Ok(crate::model::StreamEvent::ToolCall(call))) => {
                let chunk = json!({"type": "tool-call", "name": call.name, "arguments": call.arguments});
                Some((chunk, state))
            }
            Some(Ok(crate::model::StreamEvent::Done { usage })) => {
                state.usage = usage;
                if let Some(callback) = &state.on_finish {
                    callback
                        .on_finish(FinishInfo {
                            text: state.text.clone(),
                            usage,
                            total_usage: usage,
                            steps: 1,
                            response: json!({"text": state.text}),
                        })
                        .await;
                }
                state.done = true;
                let chunk = json!({"type": "finish", "usage": usage});
                Some((chunk, state))
            }
            Some(Err(error)) => {
                if let Some(callback) = &state.on_error {
                    callback.on_error(ErrorInfo { error: error.to_string() }).await;
                }
                state.done = true;
                let chunk = json!({"type": "error"});
                Some((chunk, state))
            }
            None => {
                state.done = true;
                None
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GenerateResult, Model, Provider, StreamEvent};
    use agentflow_types::Context as Ctx;
    use futures_util::stream::BoxStream;
    use std::sync::Arc;

    struct StubModel;

    #[async_trait]
    impl Model for StubModel {
        async fn generate(&self, _request: GenerateRequest) -> anyhow::Result<GenerateResult> {
            unimplemented!("chat always streams")
        }

        async fn stream(&self, _request: GenerateRequest) -> anyhow::Result<BoxStream<'static, anyhow::Result<StreamEvent>>> {
            let events = vec![
                Ok(StreamEvent::TextDelta("hel".into())),
                Ok(StreamEvent::TextDelta("lo".into())),
                Ok(StreamEvent::Done { usage: Usage::default() }),
            ];
            Ok(stream::iter(events).boxed())
        }
    }

    struct StubProvider;

    impl Provider for StubProvider {
        fn create_model(&self, _config: &Value) -> anyhow::Result<Arc<dyn Model>> {
            Ok(Arc::new(StubModel))
        }
    }

    #[tokio::test]
    async fn returns_a_response_with_text_delta_chunks() {
        registry::reset_provider_registry();
        registry::register_provider("stub", Arc::new(StubProvider));
        let mut context = Ctx::new(Value::Null, false);
        let config = Map::from_iter([
            ("provider".to_string(), json!("stub")),
            ("messages".to_string(), json!([{"role": "user", "parts": [{"type": "text", "text": "hi"}]}])),
        ]);
        let output = ChatHandler.call(&config, &mut context).await.unwrap();
        let HandlerOutput::Response(response) = output else { panic!("expected a streaming response") };
        let chunks: Vec<Value> = response.stream.collect().await;
        assert_eq!(chunks[0]["type"], "text-delta");
        assert_eq!(chunks.last().unwrap()["type"], "finish");
    }

    #[tokio::test]
    async fn prepends_trace_data_part_when_observability_enabled() {
        registry::reset_provider_registry();
        registry::register_provider("stub", Arc::new(StubProvider));
        let mut context = Ctx::new(Value::Null, true);
        context.push_event(agentflow_types::Event::Start {
            meta: agentflow_types::StepMeta { step_id: "c".into(), step_type: "chat".into(), step_index: 0, total_steps: 1 },
            timestamp: 0,
        });
        let config = Map::from_iter([
            ("provider".to_string(), json!("stub")),
            ("messages".to_string(), json!([{"role": "user", "parts": [{"type": "text", "text": "hi"}]}])),
        ]);
        let output = ChatHandler.call(&config, &mut context).await.unwrap();
        let HandlerOutput::Response(response) = output else { panic!("expected a streaming response") };
        let chunks: Vec<Value> = response.stream.collect().await;
        assert_eq!(chunks[0]["type"], "data-trace");
        assert_eq!(chunks[0]["transient"], true);
    }
}
