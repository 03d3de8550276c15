//! Serde-friendly projection of `rmcp`'s tool model.
//!
//! Grounded in `McpToolMetadata` (`crates/mcp/src/types/tools.rs`):
//! downstream code (the Tool Registry bridge in [`crate::bridge`]) works against this
//! shape rather than depending on `rmcp::model` internals directly.

use rmcp::model::Tool as RmcpTool;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpToolMetadata {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Value,
}

impl McpToolMetadata {
    pub fn from_rmcp(tool: &RmcpTool) -> Self {
        Self {
            name: tool.name.to_string(),
            description: tool.description.as_ref().map(|d| d.to_string()),
            input_schema: Value::Object((tool.input_schema.as_ref()).clone()),
        }
    }
}

impl From<RmcpTool> for McpToolMetadata {
    fn from(tool: RmcpTool) -> Self {
        Self::from_rmcp(&tool)
    }
}
