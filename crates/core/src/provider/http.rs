//! A concrete, OpenAI-Chat-Completions-shaped HTTP [`Provider`] (§11).
//!
//! Grounded in `HerokuClient` (`crates/api`): a `reqwest::Client` built
//! once with a fixed timeout and a bearer token read lazily from an environment
//! variable, never from manifest config (§6: "the core itself reads none directly").
//! This is one example provider, not a comprehensive model catalog; additional
//! providers are registered the same way, not added to the core.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::ModelMessage;
use crate::model::{GenerateRequest, GenerateResult, Model, Provider, StreamEvent, ToolCall, Usage};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Registers an HTTP provider under `name`, reading its bearer token from
/// `api_key_env_var` and sending chat-completions requests to `base_url`.
pub struct HttpProvider {
    base_url: String,
    api_key_env_var: String,
}

impl HttpProvider {
    pub fn new(base_url: impl Into<String>, api_key_env_var: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), api_key_env_var: api_key_env_var.into() }
    }
}

impl Provider for HttpProvider {
    fn create_model(&self, config: &Value) -> anyhow::Result<Arc<dyn Model>> {
        let api_key = std::env::var(&self.api_key_env_var)
            .map_err(|_| anyhow::anyhow!("environment variable '{}' is not set", self.api_key_env_var))?;

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| anyhow::anyhow!("failed to build http client: {source}"))?;

        let model_name = config.as_str().map(str::to_string).unwrap_or_else(|| "default".to_string());

        Ok(Arc::new(HttpModel { client, base_url: self.base_url.clone(), api_key, model_name }))
    }
}

struct HttpModel {
    client: Client,
    base_url: String,
    api_key: String,
    model_name: String,
}

#[cfg(test)]
impl HttpModel {
    fn for_test(model_name: &str) -> Self {
        Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build().expect("build http client"),
            base_url: "https://api.example.com/v1".to_string(),
            api_key: "token".to_string(),
            model_name: model_name.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatCompletionMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ChatCompletionTool<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct ChatCompletionMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatCompletionTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: ChatCompletionFunction<'a>,
}

#[derive(Serialize)]
struct ChatCompletionFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
    #[serde(default)]
    usage: ChatCompletionUsage,
}

#[derive(Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionResponseMessage,
}

#[derive(Deserialize)]
struct ChatCompletionResponseMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Vec<ChatCompletionResponseToolCall>,
}

#[derive(Deserialize)]
struct ChatCompletionResponseToolCall {
    function: ChatCompletionResponseFunctionCall,
}

#[derive(Deserialize)]
struct ChatCompletionResponseFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Deserialize, Default)]
struct ChatCompletionUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

impl HttpModel {
    fn build_request<'a>(&self, request: &'a GenerateRequest, stream: bool) -> ChatCompletionRequest<'a> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = &request.system {
            messages.push(ChatCompletionMessage { role: "system", content: system });
        }
        messages.extend(request.messages.iter().map(|m: &ModelMessage| ChatCompletionMessage { role: &m.role, content: &m.content }));

        ChatCompletionRequest {
            model: request.model.as_deref().unwrap_or(&self.model_name),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            tools: request
                .tools
                .iter()
                .map(|tool| ChatCompletionTool {
                    kind: "function",
                    function: ChatCompletionFunction { name: &tool.name, description: &tool.description, parameters: &tool.parameters },
                })
                .collect(),
            stream,
        }
    }
}

#[async_trait]
impl Model for HttpModel {
    async fn generate(&self, request: GenerateRequest) -> anyhow::Result<GenerateResult> {
        let body = self.build_request(&request, false);
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|source| anyhow::anyhow!("network error calling provider: {source}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("provider request failed with status {status}: {text}");
        }

        let parsed: ChatCompletionResponse =
            response.json().await.map_err(|source| anyhow::anyhow!("failed to parse provider response: {source}"))?;
        let choice = parsed.choices.into_iter().next().ok_or_else(|| anyhow::anyhow!("provider returned no choices"))?;

        Ok(GenerateResult {
            text: choice.message.content,
            usage: Usage {
                prompt_tokens: parsed.usage.prompt_tokens,
                completion_tokens: parsed.usage.completion_tokens,
                total_tokens: parsed.usage.total_tokens,
            },
            tool_calls: choice
                .message
                .tool_calls
                .into_iter()
                .map(|call| ToolCall {
                    name: call.function.name,
                    arguments: serde_json::from_str(&call.function.arguments).unwrap_or(Value::Null),
                })
                .collect(),
        })
    }

    async fn stream(&self, request: GenerateRequest) -> anyhow::Result<BoxStream<'static, anyhow::Result<StreamEvent>>> {
        // The example HTTP provider does not implement server-sent-event parsing; it
        // simulates streaming by running a blocking generation and replaying the
        // result as a single text-delta followed by `Done`. A provider backed by a
        // real SSE endpoint would parse chunks incrementally instead.
        let result = self.generate(request).await?;
        let events = vec![Ok(StreamEvent::TextDelta(result.text)), Ok(StreamEvent::Done { usage: result.usage })];
        Ok(stream::iter(events).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_env_var_is_a_clear_error() {
        let provider = HttpProvider::new("https://api.example.com/v1", "AGENTFLOW_TEST_PROVIDER_KEY_UNSET");
        unsafe { std::env::remove_var("AGENTFLOW_TEST_PROVIDER_KEY_UNSET") };
        let error = provider.create_model(&Value::Null).unwrap_err();
        assert!(error.to_string().contains("AGENTFLOW_TEST_PROVIDER_KEY_UNSET"));
    }

    #[test]
    fn build_request_falls_back_to_the_configured_model_name() {
        let model = HttpModel::for_test("gpt-test");
        let request = GenerateRequest { model: None, system: None, messages: vec![], tools: vec![], temperature: None, max_tokens: None };
        let built = model.build_request(&request, false);
        assert_eq!(built.model, "gpt-test");
    }

    #[test]
    fn build_request_prepends_system_message() {
        let model = HttpModel::for_test("gpt-test");
        let request = GenerateRequest {
            model: None,
            system: Some("be terse".to_string()),
            messages: vec![ModelMessage { role: "user".to_string(), content: "hi".to_string() }],
            tools: vec![],
            temperature: None,
            max_tokens: None,
        };
        let built = model.build_request(&request, false);
        assert_eq!(built.messages.len(), 2);
        assert_eq!(built.messages[0].role, "system");
    }
}
