//! Core Primitives (C6, §4.5–§4.8): the four built-in step handlers.
//!
//! [`register_builtins`] populates the Handler Registry with `llm`, `chat`,
//! `output-generator`, and `call-agent` under their canonical step-type names. Call it
//! once at process start (the CLI does this before loading a manifest); extensions
//! (§4.9) register additional step types the same way, through
//! [`crate::registry::register_handler`].

pub mod call_agent;
pub mod chat;
pub mod llm;
pub mod output;

use std::sync::Arc;

use crate::registry::register_handler;

/// Registers the four core primitives under their canonical step-type names.
/// Idempotent: re-calling simply re-registers the same implementations (logged as an
/// override, per §4.3, but harmless).
pub fn register_builtins() {
    register_handler("llm", Arc::new(llm::LlmHandler));
    register_handler("chat", Arc::new(chat::ChatHandler));
    register_handler("output-generator", Arc::new(output::OutputHandler));
    register_handler("call-agent", Arc::new(call_agent::CallAgentHandler));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry;

    #[test]
    fn register_builtins_populates_all_four_canonical_step_types() {
        registry::reset_handler_registry();
        register_builtins();
        let names = registry::handler_names();
        for expected in ["llm", "chat", "output-generator", "call-agent"] {
            assert!(names.contains(&expected.to_string()), "missing '{expected}' in handler registry");
        }
    }
}
