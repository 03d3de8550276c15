//! `call-agent` primitive (C6, §4.8): sub-agent composition.
//!
//! Locates a sub-agent manifest through a registered [`AgentLocator`] (an external
//! collaborator — agent discovery on disk is explicitly out of scope for the core,
//! §1), loads and parses it through the YAML Loader (§4.1), and re-enters a fresh
//! [`Executor`] with its own [`Context`]. A streaming [`crate::stream::Response`]
//! propagates back to the outer pipeline, short-circuiting it in turn; a `Record`
//! becomes this step's own return value.

use std::path::PathBuf;
use std::sync::{Arc, OnceLock, RwLock};

use agentflow_types::Context;
use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::executor::{DEFAULT_CALL_AGENT_DEPTH_LIMIT, ExecuteOutcome, Executor};
use crate::handler::{HandlerOutput, StepHandler};
use crate::loader::load_yaml;
use crate::resolve::resolve;

/// Resolves an `agentId` (author-chosen, manifest-local name) to a loadable path.
/// Agent discovery on disk beyond this single-hop lookup is out of scope for the core
/// (§1); applications register the locator that matches their own layout convention.
pub trait AgentLocator: Send + Sync {
    fn resolve(&self, agent_id: &str) -> anyhow::Result<PathBuf>;
}

static AGENT_LOCATOR: OnceLock<RwLock<Option<Arc<dyn AgentLocator>>>> = OnceLock::new();

fn slot() -> &'static RwLock<Option<Arc<dyn AgentLocator>>> {
    AGENT_LOCATOR.get_or_init(|| RwLock::new(None))
}

pub fn set_agent_locator(locator: Arc<dyn AgentLocator>) {
    *slot().write().expect("agent locator lock poisoned") = Some(locator);
}

pub fn agent_locator() -> Option<Arc<dyn AgentLocator>> {
    slot().read().expect("agent locator lock poisoned").clone()
}

#[cfg(test)]
pub fn reset_agent_locator() {
    *slot().write().expect("agent locator lock poisoned") = None;
}

tokio::task_local! {
    static CALL_AGENT_DEPTH: std::cell::Cell<u32>;
}

fn current_depth() -> u32 {
    CALL_AGENT_DEPTH.try_with(|depth| depth.get()).unwrap_or(0)
}

pub struct CallAgentHandler;

#[async_trait]
impl StepHandler for CallAgentHandler {
    async fn call(&self, config: &Map<String, Value>, context: &mut Context) -> anyhow::Result<HandlerOutput> {
        let depth = current_depth();
        if depth >= DEFAULT_CALL_AGENT_DEPTH_LIMIT {
            anyhow::bail!("call-agent recursion depth limit ({DEFAULT_CALL_AGENT_DEPTH_LIMIT}) exceeded");
        }

        let agent_id = config
            .get("agentId")
            .map(|template| resolve(template, context))
            .and_then(|value| value.as_str().map(str::to_string))
            .ok_or_else(|| anyhow::anyhow!("call-agent step requires an 'agentId' field"))?;

        let locator = agent_locator().ok_or_else(|| anyhow::anyhow!("no agent locator registered for call-agent"))?;
        let path = locator.resolve(&agent_id)?;
        let manifest = load_yaml(path)?;

        let resolved_input = match config.get("input") {
            Some(template) => resolve(template, context),
            None => context.input.clone(),
        };

        let executor = Executor::new(manifest);
        let depth_cell = std::cell::Cell::new(depth + 1);
        let outcome = CALL_AGENT_DEPTH.scope(depth_cell, executor.execute(resolved_input)).await?;

        Ok(match outcome {
            ExecuteOutcome::Response(response) => HandlerOutput::Response(response),
            ExecuteOutcome::Record(record) => HandlerOutput::Record(record),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry;
    use agentflow_types::Context as Ctx;
    use serde_json::json;
    use tempfile::NamedTempFile;

    struct FixedLocator {
        path: PathBuf,
    }

    impl AgentLocator for FixedLocator {
        fn resolve(&self, _agent_id: &str) -> anyhow::Result<PathBuf> {
            Ok(self.path.clone())
        }
    }

    fn write_manifest(contents: &str) -> NamedTempFile {
        use std::io::Write;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn calls_into_a_sub_agent_and_returns_its_record() {
        registry::reset_handler_registry();
        registry::register_handler("output-generator", Arc::new(crate::primitives::output::OutputHandler));
        let file = write_manifest(
            r#"
metadata:
  name: sub
  version: "1"
workflow:
  - id: s1
    type: output-generator
    config:
      template: { greeting: "hi" }
"#,
        );
        reset_agent_locator();
        set_agent_locator(Arc::new(FixedLocator { path: file.path().to_path_buf() }));

        let mut context = Ctx::new(Value::Null, false);
        let config = Map::from_iter([("agentId".to_string(), json!("sub-agent"))]);
        let output = CallAgentHandler.call(&config, &mut context).await.unwrap();
        let HandlerOutput::Record(record) = output else { panic!("expected record") };
        assert_eq!(record.get("greeting"), Some(&json!("hi")));
    }

    #[tokio::test]
    async fn missing_locator_is_a_handler_error() {
        reset_agent_locator();
        let mut context = Ctx::new(Value::Null, false);
        let config = Map::from_iter([("agentId".to_string(), json!("sub-agent"))]);
        let error = CallAgentHandler.call(&config, &mut context).await.unwrap_err();
        assert!(error.to_string().contains("agent locator"));
    }
}
