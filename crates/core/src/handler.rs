//! The Handler Registry's value type and the uniform handler contract (§4.3, §4.9).
//!
//! Every step type — the four core primitives and any extension registered under a new
//! `type` name — implements the same `async (config, context) -> Response | Record`
//! signature. The executor dispatches on `HandlerOutput` without caring which branch a
//! given step type habitually returns.

use agentflow_types::Context;
use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::stream::Response;

/// The result of invoking a step handler: either the pipeline-terminating
/// [`Response`](Response) or a [`Record`](HandlerOutput::Record) that the executor may
/// store under `step.result`.
///
/// Invariant (§3, "Handler Output"): a handler returning `Record` must not begin or own
/// a stream — there is no lazily-started stream hiding inside a `Record`'s values.
pub enum HandlerOutput {
    Response(Response),
    Record(Map<String, Value>),
}

impl HandlerOutput {
    pub fn record(map: Map<String, Value>) -> Self {
        HandlerOutput::Record(map)
    }

    pub fn is_response(&self) -> bool {
        matches!(self, HandlerOutput::Response(_))
    }
}

/// Implemented by every step handler: the four core primitives (§4.5–§4.8) and any
/// extension registered under a new `type` name (§4.9).
///
/// Resolving `config`'s variable references through the resolver (§4.2) is the
/// handler's own responsibility, not the executor's — different primitives resolve
/// different subsets of their config (e.g. `output-generator` resolves `json` in
/// whole-value mode but `template` recursively).
#[async_trait]
pub trait StepHandler: Send + Sync {
    async fn call(&self, config: &Map<String, Value>, context: &mut Context) -> anyhow::Result<HandlerOutput>;
}
