//! MCP bridge error taxonomy.
//!
//! Grounded in `McpError` (`crates/mcp/src/types/errors.rs`), trimmed to
//! the subset relevant to a single-tool-call bridge rather than a full plugin
//! lifecycle (no `Plugin`/`Log`/`Handshake`-server variants — there is no persistent
//! plugin process here, only a per-call connection).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum McpError {
    #[error("mcp bridge config error: {0}")]
    Config(String),

    #[error("failed to start mcp server process: {0}")]
    Transport(#[source] anyhow::Error),

    #[error("mcp tool call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("mcp tool invocation failed: {0}")]
    ToolInvocation(String),
}
