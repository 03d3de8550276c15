//! `agentflow-mcp`: a concrete external-tool bridge (§11), registered as the
//! `mcp-tool` step type.
//!
//! Demonstrates §4.9's extension contract end to end against a real protocol client
//! (`rmcp`) rather than leaving "external tool bridges" purely theoretical. Not a
//! general-purpose MCP plugin host — no server lifecycle, health tracking, or HTTP
//! transport, all of which the `oatty-mcp` crate this was adapted from carried for its
//! TUI plugin manager and which has no counterpart in this specification.

pub mod bridge;
pub mod client;
pub mod errors;
pub mod types;

use std::sync::Arc;

use agentflow_core::registry::register_handler;

/// Registers the `mcp-tool` step handler into the core's Handler Registry. Call once
/// alongside [`agentflow_core::primitives::register_builtins`].
pub fn register_bridge() {
    register_handler("mcp-tool", Arc::new(bridge::McpToolHandler));
}
