//! Model and tool abstractions used by the `llm` and `chat` primitives (§4.5, §4.6).
//!
//! The core does not talk to any particular vendor's API; it only defines the shape a
//! [`Provider`] factory must produce. Concrete providers (e.g.
//! [`crate::provider::http`]) implement these traits against a real HTTP API.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::ModelMessage;

/// Token accounting returned alongside a generation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// A tool exposed to the model, bridging the Tool Registry's `{description, parameter
/// schema}` pair (§4.3) into the request a provider sends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A model-issued request to invoke a registered tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub arguments: Value,
}

/// The resolved, already-converted inputs to a single generation call.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: Option<String>,
    pub system: Option<String>,
    pub messages: Vec<ModelMessage>,
    pub tools: Vec<ToolSpec>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u64>,
}

/// The result of a non-streaming generation (§4.5: "Returns `{text, usage}`").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateResult {
    pub text: String,
    pub usage: Usage,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

/// One chunk of a streaming generation.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    TextDelta(String),
    ToolCall(ToolCall),
    Done { usage: Usage },
}

/// A bound model session, produced by a [`Provider`] for one step invocation.
///
/// Model sessions are constructed per step (§5, "Model sessions are constructed per
/// step; pooling is a provider concern, not a core concern").
#[async_trait]
pub trait Model: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> anyhow::Result<GenerateResult>;

    async fn stream(&self, request: GenerateRequest) -> anyhow::Result<BoxStream<'static, anyhow::Result<StreamEvent>>>;
}

/// The Provider Registry's value type: a `createModel(config) -> ModelHandle` factory
/// (§4.3).
pub trait Provider: Send + Sync {
    fn create_model(&self, config: &Value) -> anyhow::Result<std::sync::Arc<dyn Model>>;
}

/// The Tool Registry's value type (§4.3): description, JSON-schema parameters, and the
/// callable itself.
#[async_trait]
pub trait Tool: Send + Sync {
    fn description(&self) -> &str;
    fn parameters(&self) -> &Value;
    async fn execute(&self, arguments: Value) -> anyhow::Result<Value>;

    fn spec(&self, name: &str) -> ToolSpec {
        ToolSpec {
            name: name.to_string(),
            description: self.description().to_string(),
            parameters: self.parameters().clone(),
        }
    }
}

/// Summary handed to a registered `onFinish` callback (§4.6).
#[derive(Debug, Clone, Default, Serialize)]
pub struct FinishInfo {
    pub text: String,
    pub usage: Usage,
    pub total_usage: Usage,
    pub steps: u32,
    pub response: Value,
}

/// Summary handed to a registered `onError` callback (§4.6). Unlike trace events, a
/// callback is application-supplied code the author named explicitly in their own
/// manifest, so it is not subject to §7's trace-sanitization rule.
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    pub error: String,
}

/// The Callback Registry's value type (§4.3): a named lifecycle hook an embedding
/// application supplies for `onFinish`/`onError`.
#[async_trait]
pub trait Callback: Send + Sync {
    async fn on_finish(&self, _info: FinishInfo) {}
    async fn on_error(&self, _info: ErrorInfo) {}
}
