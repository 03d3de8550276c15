//! The `mcp-tool` step handler: a concrete extension primitive (§4.9) registered
//! against a real MCP server rather than a purely theoretical extension contract
//! (§11).
//!
//! Config: `{command, args?, toolName, arguments?}`. Resolves `arguments` through the
//! resolver (§4.2), like any other handler's config, then spawns `command` over stdio,
//! performs the MCP handshake, calls `toolName`, and returns the tool's result as a
//! `Record` — or, per §4.9's recommended discipline, a `{success:false, error}` record
//! for a recoverable I/O failure rather than propagating it as a programming error.

use agentflow_core::handler::{HandlerOutput, StepHandler};
use agentflow_core::resolve::resolve;
use agentflow_types::Context;
use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::client::McpClient;

pub struct McpToolHandler;

#[async_trait]
impl StepHandler for McpToolHandler {
    async fn call(&self, config: &Map<String, Value>, context: &mut Context) -> anyhow::Result<HandlerOutput> {
        let config_value = Value::Object(config.clone());
        let resolved = resolve(&config_value, context);
        let resolved = resolved.as_object().ok_or_else(|| anyhow::anyhow!("mcp-tool config must resolve to a mapping"))?;

        let command = resolved
            .get("command")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("mcp-tool step requires a 'command' field"))?;
        let tool_name = resolved
            .get("toolName")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("mcp-tool step requires a 'toolName' field"))?;
        let args: Vec<String> = resolved
            .get("args")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();
        let arguments = match resolved.get("arguments") {
            Some(Value::Object(map)) => map.clone(),
            Some(_) | None => Map::new(),
        };

        let client = match McpClient::connect_stdio(command, &args).await {
            Ok(client) => client,
            Err(error) => return Ok(recoverable_failure(error.to_string())),
        };

        let result = client.call_tool(tool_name, arguments).await;
        client.disconnect().await;

        match result {
            Ok(value) => Ok(HandlerOutput::Record(Map::from_iter([("success".to_string(), Value::Bool(true)), ("result".to_string(), value)]))),
            Err(error) => Ok(recoverable_failure(error.to_string())),
        }
    }
}

fn recoverable_failure(error: String) -> HandlerOutput {
    HandlerOutput::Record(Map::from_iter([("success".to_string(), Value::Bool(false)), ("error".to_string(), Value::String(error))]))
}
