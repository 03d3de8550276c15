//! `llm` primitive (C6, §4.5): a single, non-streaming generation, with an optional
//! bounded tool loop.
//!
//! Resolves `system` and `messages` through §4.2 "without format conversion" — the
//! resolved `messages` value is deserialized directly into the provider-facing
//! [`ModelMessage`] shape, treating "the model's native message shape" as whatever a
//! `Model` implementation expects; this crate has exactly one concrete shape for that
//! (see DESIGN.md, "native message shape").

use agentflow_types::Context;
use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::executor::reference_error;
use crate::handler::{HandlerOutput, StepHandler};
use crate::message::ModelMessage;
use crate::model::{GenerateRequest, ToolSpec, Usage};
use crate::registry;
use crate::resolve::resolve;

/// Upper bound on tool-invocation rounds within a single `llm` call, absent an explicit
/// `toolLoopLimit` in config (§4.5: "bounded by a step-count limit; recommended
/// default: 5").
pub const DEFAULT_TOOL_LOOP_LIMIT: u32 = 5;

pub struct LlmHandler;

#[async_trait]
impl StepHandler for LlmHandler {
    async fn call(&self, config: &Map<String, Value>, context: &mut Context) -> anyhow::Result<HandlerOutput> {
        let config_value = Value::Object(config.clone());
        let resolved = resolve(&config_value, context);
        let resolved = resolved.as_object().ok_or_else(|| anyhow::anyhow!("llm config must resolve to a mapping"))?;

        let provider_name = resolved
            .get("provider")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("llm step requires a 'provider' field"))?;
        let provider = registry::provider(provider_name)
            .ok_or_else(|| anyhow::anyhow!("no provider registered under '{provider_name}'"))?;

        let model_config = resolved.get("model").cloned().unwrap_or(Value::Null);
        let model = provider.create_model(&model_config)?;

        let system = resolved.get("system").and_then(Value::as_str).map(str::to_string);
        let mut messages: Vec<ModelMessage> = match resolved.get("messages") {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|source| anyhow::anyhow!("llm 'messages' must resolve to the native message shape: {source}"))?,
            None => return Err(reference_error("llm", "'messages' is required and resolved to undefined")),
        };

        let tools = resolve_tools(resolved.get("tools"))?;
        let temperature = resolved.get("temperature").and_then(Value::as_f64);
        let max_tokens = resolved.get("maxTokens").and_then(Value::as_u64);
        let tool_loop_limit = resolved.get("toolLoopLimit").and_then(Value::as_u64).map(|v| v as u32).unwrap_or(DEFAULT_TOOL_LOOP_LIMIT);

        let mut total_usage = Usage::default();
        let mut final_text = String::new();

        for _ in 0..tool_loop_limit.max(1) {
            let request = GenerateRequest {
                model: resolved.get("model").and_then(Value::as_str).map(str::to_string),
                system: system.clone(),
                messages: messages.clone(),
                tools: tools.clone(),
                temperature,
                max_tokens,
            };
            let result = model.generate(request).await?;
            total_usage.prompt_tokens += result.usage.prompt_tokens;
            total_usage.completion_tokens += result.usage.completion_tokens;
            total_usage.total_tokens += result.usage.total_tokens;
            final_text = result.text;

            if result.tool_calls.is_empty() || tools.is_empty() {
                break;
            }

            messages.push(ModelMessage { role: "assistant".to_string(), content: final_text.clone() });
            for call in &result.tool_calls {
                let tool = registry::tool(&call.name)
                    .ok_or_else(|| anyhow::anyhow!("no tool registered under '{}'", call.name))?;
                let tool_result = tool.execute(call.arguments.clone()).await?;
                messages.push(ModelMessage { role: "tool".to_string(), content: tool_result.to_string() });
            }
        }

        Ok(HandlerOutput::Record(Map::from_iter([
            ("text".to_string(), Value::String(final_text)),
            ("usage".to_string(), serde_json::to_value(total_usage)?),
        ])))
    }
}

fn resolve_tools(value: Option<&Value>) -> anyhow::Result<Vec<ToolSpec>> {
    let Some(names) = value.and_then(Value::as_array) else { return Ok(Vec::new()) };
    names
        .iter()
        .map(|name| {
            let name = name.as_str().ok_or_else(|| anyhow::anyhow!("tool entries must be strings naming a registered tool"))?;
            let tool = registry::tool(name).ok_or_else(|| anyhow::anyhow!("tool-binding error: no tool registered under '{name}'"))?;
            Ok(tool.spec(name))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GenerateResult, Model, Provider, ToolCall};
    use agentflow_types::Context as Ctx;
    use futures_util::stream::BoxStream;
    use serde_json::json;
    use std::sync::Arc;

    struct StubModel {
        text: &'static str,
        tool_call_once: bool,
    }

    #[async_trait]
    impl Model for StubModel {
        async fn generate(&self, request: GenerateRequest) -> anyhow::Result<GenerateResult> {
            let already_has_tool_message = request.messages.iter().any(|m| m.role == "tool");
            if self.tool_call_once && !already_has_tool_message {
                return Ok(GenerateResult {
                    text: "calling tool".into(),
                    tool_calls: vec![ToolCall { name: "echo".into(), arguments: json!({"x": 1}) }],
                    ..Default::default()
                });
            }
            Ok(GenerateResult { text: self.text.to_string(), ..Default::default() })
        }

        async fn stream(&self, _request: GenerateRequest) -> anyhow::Result<BoxStream<'static, anyhow::Result<crate::model::StreamEvent>>> {
            unimplemented!("not exercised by llm primitive tests")
        }
    }

    struct StubProvider {
        text: &'static str,
        tool_call_once: bool,
    }

    impl Provider for StubProvider {
        fn create_model(&self, _config: &Value) -> anyhow::Result<Arc<dyn Model>> {
            Ok(Arc::new(StubModel { text: self.text, tool_call_once: self.tool_call_once }))
        }
    }

    struct EchoTool;

    #[async_trait]
    impl crate::model::Tool for EchoTool {
        fn description(&self) -> &str {
            "echoes its arguments"
        }
        fn parameters(&self) -> &Value {
            static SCHEMA: std::sync::OnceLock<Value> = std::sync::OnceLock::new();
            SCHEMA.get_or_init(|| json!({"type": "object"}))
        }
        async fn execute(&self, arguments: Value) -> anyhow::Result<Value> {
            Ok(arguments)
        }
    }

    #[tokio::test]
    async fn returns_text_and_usage_from_the_provider() {
        registry::reset_provider_registry();
        registry::register_provider("stub", Arc::new(StubProvider { text: "hello", tool_call_once: false }));
        let mut context = Ctx::new(Value::Null, false);
        let config = Map::from_iter([
            ("provider".to_string(), json!("stub")),
            ("messages".to_string(), json!([{"role": "user", "content": "hi"}])),
        ]);
        let output = LlmHandler.call(&config, &mut context).await.unwrap();
        let HandlerOutput::Record(record) = output else { panic!("expected record") };
        assert_eq!(record.get("text"), Some(&json!("hello")));
    }

    #[tokio::test]
    async fn missing_provider_field_is_a_reference_error() {
        let mut context = Ctx::new(Value::Null, false);
        let config = Map::from_iter([("messages".to_string(), json!([]))]);
        let error = LlmHandler.call(&config, &mut context).await.unwrap_err();
        assert!(error.to_string().contains("provider"));
    }

    #[tokio::test]
    async fn runs_a_bounded_tool_loop_then_returns_final_text() {
        registry::reset_provider_registry();
        registry::reset_tool_registry();
        registry::register_provider("stub", Arc::new(StubProvider { text: "done", tool_call_once: true }));
        registry::register_tool("echo", Arc::new(EchoTool));
        let mut context = Ctx::new(Value::Null, false);
        let config = Map::from_iter([
            ("provider".to_string(), json!("stub")),
            ("messages".to_string(), json!([{"role": "user", "content": "hi"}])),
            ("tools".to_string(), json!(["echo"])),
        ]);
        let output = LlmHandler.call(&config, &mut context).await.unwrap();
        let HandlerOutput::Record(record) = output else { panic!("expected record") };
        assert_eq!(record.get("text"), Some(&json!("done")));
    }
}
