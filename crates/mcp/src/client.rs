//! `McpClient`: a short-lived, stdio-transport `rmcp` connection for one bridge call.
//!
//! Grounded in `McpClient` (`crates/mcp/src/client/core.rs`): same
//! `TOOL_INVOCATION_TIMEOUT` constant and `call_tool` timeout-wrapped invocation
//! pattern, trimmed to stdio transport only and with no persistent plugin lifecycle
//! (status/health tracking, HTTP transport, log capture) — each bridge call in this
//! crate connects, calls one tool, and disconnects.

use std::process::Stdio;
use std::time::Duration;

use rmcp::RoleClient;
use rmcp::model::CallToolRequestParam;
use rmcp::service::{RunningService, ServiceExt as _};
use rmcp::transport::TokioChildProcess;
use tokio::process::Command;

use crate::errors::McpError;
use crate::types::McpToolMetadata;

/// Matches the per-call timeout default (§5: "the MCP primitive enforces a
/// per-call timeout, default 30s").
pub const TOOL_INVOCATION_TIMEOUT: Duration = Duration::from_secs(30);

pub struct McpClient {
    service: RunningService<RoleClient, ()>,
}

impl McpClient {
    /// Spawns `command` as a child process and performs the MCP initialize handshake
    /// over its stdio.
    pub async fn connect_stdio(command: &str, args: &[String]) -> Result<Self, McpError> {
        let mut process = Command::new(command);
        process.args(args).stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::null());

        let transport = TokioChildProcess::new(process).map_err(|source| McpError::Transport(source.into()))?;
        let service = ().serve(transport).await.map_err(|source| McpError::Transport(source.into()))?;
        Ok(Self { service })
    }

    pub async fn list_tools(&self) -> Result<Vec<McpToolMetadata>, McpError> {
        let result = self.service.list_tools(Default::default()).await.map_err(|source| McpError::ToolInvocation(source.to_string()))?;
        Ok(result.tools.iter().map(McpToolMetadata::from_rmcp).collect())
    }

    pub async fn call_tool(&self, tool_name: &str, arguments: serde_json::Map<String, serde_json::Value>) -> Result<serde_json::Value, McpError> {
        let call = self.service.call_tool(CallToolRequestParam { name: tool_name.to_string().into(), arguments: Some(arguments) });

        match tokio::time::timeout(TOOL_INVOCATION_TIMEOUT, call).await {
            Ok(Ok(result)) => serde_json::to_value(result).map_err(|source| McpError::ToolInvocation(source.to_string())),
            Ok(Err(source)) => Err(McpError::ToolInvocation(source.to_string())),
            Err(_) => Err(McpError::Timeout(TOOL_INVOCATION_TIMEOUT)),
        }
    }

    pub async fn disconnect(self) {
        let _ = self.service.cancel().await;
    }
}
