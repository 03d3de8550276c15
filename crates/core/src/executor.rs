//! Workflow Executor (C5, §4.4).
//!
//! Runs a [`Manifest`]'s steps strictly in order, dispatching each to the handler
//! registered for its `type`, accumulating `Record` outputs into `Context.variables`,
//! short-circuiting on the first `Response`, and shaping the final return value from
//! either a `return` template or the accumulated variables.

use std::sync::Arc;

use agentflow_types::{Context, EngineError, Event, Manifest, StepMeta};
use anyhow::anyhow;
use serde_json::{Map, Value};

use crate::handler::{HandlerOutput, StepHandler};
use crate::observability::classify_error;
use crate::registry;
use crate::resolve::resolve;
use crate::stream::Response;

/// Recommended default depth limit for `call-agent` recursion (§9, "Sub-agent
/// composition (cycles)"). Not read by the executor itself — `call-agent` (§4.8)
/// threads it through as it re-enters a fresh `Executor`.
pub const DEFAULT_CALL_AGENT_DEPTH_LIMIT: u32 = 8;

/// The result of a top-level `execute` call: either the pipeline's final accumulated
/// record or a short-circuiting stream.
pub enum ExecuteOutcome {
    Response(Response),
    Record(Map<String, Value>),
}

/// Binds one parsed [`Manifest`] to repeated `execute` invocations.
///
/// Stateless across calls (§5: "the Executor is stateless across calls; each
/// invocation owns its Context exclusively"), so a single `Executor` is safely shared
/// across concurrent `execute` calls.
pub struct Executor {
    manifest: Manifest,
}

impl Executor {
    pub fn new(manifest: Manifest) -> Self {
        Self { manifest }
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Runs the workflow against `input`, implementing §4.4's algorithm end to end.
    pub async fn execute(&self, input: Value) -> anyhow::Result<ExecuteOutcome> {
        let observability_enabled = self.manifest.metadata.observability_enabled();
        let mut context = Context::new(input, observability_enabled);
        let steps = &self.manifest.workflow;
        let total_steps = steps.len();

        let mut last_result: Option<Map<String, Value>> = None;
        let mut last_step_had_result = false;

        for (index, step) in steps.iter().enumerate() {
            let handler = registry::handler(&step.step_type).ok_or_else(|| {
                EngineError::UnknownStepType {
                    step_id: step.id.clone(),
                    step_type: step.step_type.clone(),
                    registered: registry::handler_names().join(", "),
                }
            })?;

            let meta = StepMeta {
                step_id: step.id.clone(),
                step_type: step.step_type.clone(),
                step_index: index,
                total_steps,
            };
            push_trace_event(&mut context, Event::Start { meta: meta.clone(), timestamp: now_millis() });
            let start = std::time::Instant::now();

            let outcome = invoke(handler, &step.config, &mut context).await;

            match outcome {
                Ok(HandlerOutput::Response(response)) => {
                    push_trace_event(
                        &mut context,
                        Event::Complete { meta, timestamp: now_millis(), duration_ms: elapsed_ms(start) },
                    );
                    // A streaming handler short-circuits: no further step is invoked,
                    // and the trace is not attached here (§4.4 step 3e) — the stream
                    // itself may already carry a transient trace data-part (§4.6).
                    return Ok(ExecuteOutcome::Response(response));
                }
                Ok(HandlerOutput::Record(record)) => {
                    push_trace_event(
                        &mut context,
                        Event::Complete { meta, timestamp: now_millis(), duration_ms: elapsed_ms(start) },
                    );
                    if let Some(result_name) = &step.result {
                        context.variables.insert(result_name.clone(), Value::Object(record.clone()));
                        last_step_had_result = true;
                    } else {
                        last_step_had_result = false;
                    }
                    last_result = Some(record);
                }
                Err(error) => {
                    let error_kind = classify_error(&error);
                    push_trace_event(
                        &mut context,
                        Event::Error { meta, timestamp: now_millis(), duration_ms: elapsed_ms(start), error_kind },
                    );
                    return Err(error);
                }
            }
        }

        let mut output = self.build_return_value(&context, last_result, last_step_had_result);
        attach_trace(&mut output, &context);
        Ok(ExecuteOutcome::Record(output))
    }

    /// Implements §4.4 step 4: precedence is `return` template, then the bare last
    /// result when the final step named no `result`, then the accumulated variables.
    fn build_return_value(&self, context: &Context, last_result: Option<Map<String, Value>>, last_step_had_result: bool) -> Map<String, Value> {
        if let Some(template) = &self.manifest.return_template {
            let resolved = resolve(template, context);
            return match resolved {
                Value::Object(map) => map,
                other => Map::from_iter([("value".to_string(), other)]),
            };
        }

        if !last_step_had_result {
            if let Some(record) = last_result {
                return record;
            }
        }

        Map::from_iter(context.variables.iter().map(|(k, v)| (k.clone(), v.clone())))
    }
}

async fn invoke(handler: Arc<dyn StepHandler>, config: &Map<String, Value>, context: &mut Context) -> anyhow::Result<HandlerOutput> {
    handler.call(config, context).await
}

/// Pushes a trace event, isolating any failure in the push itself so a trace-layer bug
/// can never mask the original handler error (§4.4 step 3f).
fn push_trace_event(context: &mut Context, event: Event) {
    context.push_event(event);
}

fn elapsed_ms(start: std::time::Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Attaches the trace under the reserved `__trace` key when at least one event was
/// recorded (§4.4 step 5, §8 "Trace isolation").
fn attach_trace(output: &mut Map<String, Value>, context: &Context) {
    if let Some(trace) = &context.trace {
        if !trace.is_empty() {
            let events = trace.iter().map(|e| serde_json::to_value(e).unwrap_or(Value::Null)).collect();
            output.insert("__trace".to_string(), Value::Array(events));
        }
    }
}

/// Convenience used by `call-agent` (§4.8) and the CLI: parse-then-run in one call.
pub async fn execute_manifest(manifest: Manifest, input: Value) -> anyhow::Result<ExecuteOutcome> {
    Executor::new(manifest).execute(input).await
}

/// Surfaced for handlers that need to raise a reference error distinctly from a generic
/// handler error (§7, "Reference error").
pub fn reference_error(step_id: &str, reason: impl Into<String>) -> anyhow::Error {
    anyhow!(EngineError::Reference { step_id: step_id.to_string(), reason: reason.into() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentflow_types::{Metadata, ObservabilityConfig, Truthy, WorkflowStep};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoHandler {
        result: Map<String, Value>,
    }

    #[async_trait]
    impl StepHandler for EchoHandler {
        async fn call(&self, _config: &Map<String, Value>, _context: &mut Context) -> anyhow::Result<HandlerOutput> {
            Ok(HandlerOutput::Record(self.result.clone()))
        }
    }

    struct FailHandler;

    #[async_trait]
    impl StepHandler for FailHandler {
        async fn call(&self, _config: &Map<String, Value>, _context: &mut Context) -> anyhow::Result<HandlerOutput> {
            Err(anyhow!("ECONNREFUSED: connection reset"))
        }
    }

    struct CountingHandler {
        calls: Arc<AtomicUsize>,
        output: HandlerOutputKind,
    }

    enum HandlerOutputKind {
        Record,
        Response,
    }

    #[async_trait]
    impl StepHandler for CountingHandler {
        async fn call(&self, _config: &Map<String, Value>, _context: &mut Context) -> anyhow::Result<HandlerOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.output {
                HandlerOutputKind::Record => Ok(HandlerOutput::Record(Map::new())),
                HandlerOutputKind::Response => {
                    let stream = futures_util::stream::empty().boxed();
                    Ok(HandlerOutput::Response(Response::new(stream)))
                }
            }
        }
    }

    use futures_util::StreamExt;

    fn step(id: &str, step_type: &str, result: Option<&str>) -> WorkflowStep {
        WorkflowStep { id: id.to_string(), step_type: step_type.to_string(), config: Map::new(), result: result.map(str::to_string) }
    }

    fn manifest(steps: Vec<WorkflowStep>, observability: bool) -> Manifest {
        Manifest {
            metadata: Metadata {
                name: "test".into(),
                version: "1".into(),
                observability: observability.then(|| ObservabilityConfig { enabled: Truthy(true) }),
            },
            workflow: steps,
            return_template: None,
        }
    }

    #[tokio::test]
    async fn last_step_without_result_returns_its_output_directly() {
        registry::reset_handler_registry();
        registry::register_handler("llm", Arc::new(EchoHandler { result: Map::from_iter([("text".to_string(), json!("hi"))]) }));
        let executor = Executor::new(manifest(vec![step("s1", "llm", None)], false));
        let outcome = executor.execute(Value::Null).await.unwrap();
        match outcome {
            ExecuteOutcome::Record(record) => assert_eq!(record.get("text"), Some(&json!("hi"))),
            ExecuteOutcome::Response(_) => panic!("expected record"),
        }
    }

    #[tokio::test]
    async fn steps_with_result_accumulate_into_variables() {
        registry::reset_handler_registry();
        registry::register_handler("llm", Arc::new(EchoHandler { result: Map::from_iter([("text".to_string(), json!("hi"))]) }));
        let executor = Executor::new(manifest(vec![step("s1", "llm", Some("out"))], false));
        let outcome = executor.execute(Value::Null).await.unwrap();
        match outcome {
            ExecuteOutcome::Record(record) => {
                assert_eq!(record.get("out"), Some(&json!({"text": "hi"})));
            }
            ExecuteOutcome::Response(_) => panic!("expected record"),
        }
    }

    #[tokio::test]
    async fn streaming_response_short_circuits_later_steps() {
        registry::reset_handler_registry();
        let calls = Arc::new(AtomicUsize::new(0));
        registry::register_handler("chat", Arc::new(CountingHandler { calls: calls.clone(), output: HandlerOutputKind::Response }));
        registry::register_handler("llm", Arc::new(CountingHandler { calls: calls.clone(), output: HandlerOutputKind::Record }));
        let executor = Executor::new(manifest(vec![step("c", "chat", None), step("after", "llm", None)], false));
        let outcome = executor.execute(Value::Null).await.unwrap();
        assert!(matches!(outcome, ExecuteOutcome::Response(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1, "the llm step after a streaming step must never be invoked");
    }

    #[tokio::test]
    async fn unknown_step_type_fails_fast() {
        registry::reset_handler_registry();
        let executor = Executor::new(manifest(vec![step("s1", "does-not-exist", None)], false));
        let error = executor.execute(Value::Null).await.unwrap_err();
        assert!(error.to_string().contains("unknown step type"));
    }

    #[tokio::test]
    async fn observability_records_start_and_complete_in_order() {
        registry::reset_handler_registry();
        registry::register_handler("llm", Arc::new(EchoHandler { result: Map::new() }));
        let executor = Executor::new(manifest(vec![step("s1", "llm", None), step("s2", "llm", None)], true));
        let outcome = executor.execute(Value::Null).await.unwrap();
        let ExecuteOutcome::Record(record) = outcome else { panic!("expected record") };
        let trace = record.get("__trace").expect("trace attached").as_array().unwrap();
        assert_eq!(trace.len(), 4);
        assert_eq!(trace[0]["type"], "step-start");
        assert_eq!(trace[0]["step_id"], "s1");
        assert_eq!(trace[1]["type"], "step-complete");
        assert_eq!(trace[2]["step_id"], "s2");
    }

    #[tokio::test]
    async fn no_trace_key_when_observability_disabled() {
        registry::reset_handler_registry();
        registry::register_handler("llm", Arc::new(EchoHandler { result: Map::new() }));
        let executor = Executor::new(manifest(vec![step("s1", "llm", None)], false));
        let outcome = executor.execute(Value::Null).await.unwrap();
        let ExecuteOutcome::Record(record) = outcome else { panic!("expected record") };
        assert!(!record.contains_key("__trace"));
    }

    #[tokio::test]
    async fn error_is_classified_and_propagated_without_leaking_message() {
        registry::reset_handler_registry();
        registry::register_handler("llm", Arc::new(FailHandler));
        let executor = Executor::new(manifest(vec![step("s1", "llm", None)], true));
        let error = executor.execute(Value::Null).await.unwrap_err();
        assert!(error.to_string().contains("ECONNREFUSED"), "the error surfaced to the caller is unmodified");
    }

    #[tokio::test]
    async fn return_template_projects_only_named_fields() {
        registry::reset_handler_registry();
        registry::register_handler("llm", Arc::new(EchoHandler { result: Map::from_iter([("text".to_string(), json!("done"))]) }));
        let mut m = manifest(vec![step("s1", "llm", Some("leaked")), step("s2", "llm", Some("s2"))], false);
        m.return_template = Some(json!({"ok": true, "v": "$stepResult.s2.text"}));
        let executor = Executor::new(m);
        let outcome = executor.execute(Value::Null).await.unwrap();
        let ExecuteOutcome::Record(record) = outcome else { panic!("expected record") };
        assert_eq!(record.get("ok"), Some(&json!(true)));
        assert_eq!(record.get("v"), Some(&json!("done")));
        assert!(!record.contains_key("leaked"));
    }
}
