//! Handler Registry: step `type` -> handler implementation (§4.3).
//!
//! The dispatch table the executor consults at `handlers[step.type]` (§4.4 step 3a).
//! Populated with the four core primitives at first use via [`crate::primitives::register_builtins`].

use std::sync::Arc;

use once_cell::sync::Lazy;

use super::Registry;
use crate::handler::StepHandler;

static HANDLERS: Lazy<Registry<Arc<dyn StepHandler>>> = Lazy::new(|| Registry::new("handler"));

pub fn register_handler(name: impl Into<String>, handler: Arc<dyn StepHandler>) {
    HANDLERS.register(name, handler);
}

pub fn handler(name: &str) -> Option<Arc<dyn StepHandler>> {
    HANDLERS.get(name)
}

pub fn handler_names() -> Vec<String> {
    HANDLERS.names()
}

#[cfg(test)]
pub fn reset_handler_registry() {
    HANDLERS.reset();
}
