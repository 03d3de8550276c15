//! Execution context shared between the executor and step handlers.

use indexmap::IndexMap;
use serde_json::Value;

use crate::event::Event;

/// Per-`execute` call state.
///
/// Created by the executor, mutated by step handlers only through the `variables`
/// slot, and discarded once the top-level call returns. See §3 ("Execution Context")
/// and §5 ("Ownership"): the executor exclusively owns this
/// value for the duration of a call; handlers receive a borrowed reference.
#[derive(Debug, Clone)]
pub struct Context {
    /// Opaque request payload, conventionally a JSON object containing `messages`.
    pub input: Value,
    /// Insertion-preserving mapping from variable name to resolved value.
    ///
    /// `IndexMap` (rather than `HashMap`) keeps iteration order deterministic
    /// when the executor materializes `variables` into the returned record (§4.4 step
    /// 4, "else return `Object.entries(variables)`").
    pub variables: IndexMap<String, Value>,
    /// Ordered lifecycle events, present only when observability is enabled.
    pub trace: Option<Vec<Event>>,
}

impl Context {
    pub fn new(input: Value, observability_enabled: bool) -> Self {
        Self {
            input,
            variables: IndexMap::new(),
            trace: observability_enabled.then(Vec::new),
        }
    }

    /// Push a trace event if tracing is enabled; a no-op otherwise.
    pub fn push_event(&mut self, event: Event) {
        if let Some(trace) = &mut self.trace {
            trace.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_context_has_no_trace_when_disabled() {
        let ctx = Context::new(Value::Null, false);
        assert!(ctx.trace.is_none());
        assert!(ctx.variables.is_empty());
    }

    #[test]
    fn new_context_has_empty_trace_when_enabled() {
        let ctx = Context::new(Value::Null, true);
        assert_eq!(ctx.trace, Some(Vec::new()));
    }
}
