//! Tool Registry: tool name -> `{description, parameter schema, execute}` (§4.3).

use std::sync::Arc;

use once_cell::sync::Lazy;

use super::Registry;
use crate::model::Tool;

static TOOLS: Lazy<Registry<Arc<dyn Tool>>> = Lazy::new(|| Registry::new("tool"));

pub fn register_tool(name: impl Into<String>, tool: Arc<dyn Tool>) {
    TOOLS.register(name, tool);
}

pub fn tool(name: &str) -> Option<Arc<dyn Tool>> {
    TOOLS.get(name)
}

pub fn tool_names() -> Vec<String> {
    TOOLS.names()
}

#[cfg(test)]
pub fn reset_tool_registry() {
    TOOLS.reset();
}
