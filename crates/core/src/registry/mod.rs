//! The four process-wide registries (§4.3, §9 "Registries as mutable singletons").
//!
//! Each registry is a name-keyed mapping with the same override contract: registering
//! under an existing name replaces the previous entry and logs a warning, it never
//! fails. Reads never take a write lock, matching §5's "reads are unsynchronized"
//! characterization for a cooperative single-threaded runtime — here backed by
//! `std::sync::RwLock` rather than true unsynchronized access, since `execute` calls can
//! run on separate tokio tasks.
//!
//! `Entry` values are cheaply `Clone`-able (`Arc<dyn Trait>` in every concrete
//! instantiation below), so `get` returns an owned copy rather than a guard, keeping the
//! lock scope to the lookup itself.

mod callback;
mod handler;
mod provider;
mod tool;

pub use callback::{callback, callback_names, register_callback};
pub use handler::{handler, handler_names, register_handler};
pub use provider::{provider, provider_names, register_provider};
pub use tool::{register_tool, tool, tool_names};

#[cfg(test)]
pub use callback::reset_callback_registry;
#[cfg(test)]
pub use handler::reset_handler_registry;
#[cfg(test)]
pub use provider::reset_provider_registry;
#[cfg(test)]
pub use tool::reset_tool_registry;

use std::sync::RwLock;

use indexmap::IndexMap;

/// Generic, insertion-order-preserving, name-keyed registry shared by the four
/// concrete registries in this module.
///
/// Not exported; each submodule wraps one `Registry<V>` behind typed free functions
/// (`register_handler`, `handler`, …) rather than exposing the generic type, since the
/// specification describes four distinct named registries, not one generic one.
pub(crate) struct Registry<V> {
    name: &'static str,
    entries: RwLock<IndexMap<String, V>>,
}

impl<V: Clone> Registry<V> {
    pub(crate) fn new(name: &'static str) -> Self {
        Self { name, entries: RwLock::new(IndexMap::new()) }
    }

    /// Inserts or replaces an entry. Replacing an existing name is allowed and logged
    /// at `warn`, never rejected (§4.3: "last registration wins with a diagnostic when
    /// overriding").
    pub(crate) fn register(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let mut entries = self.entries.write().expect("registry lock poisoned");
        if entries.contains_key(&key) {
            tracing::warn!(registry = self.name, name = %key, "overriding existing registration");
        }
        entries.insert(key, value);
    }

    pub(crate) fn get(&self, key: &str) -> Option<V> {
        self.entries.read().expect("registry lock poisoned").get(key).cloned()
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.entries.read().expect("registry lock poisoned").keys().cloned().collect()
    }

    /// Clears every registration. Only meaningful in tests: production code registers
    /// built-ins at startup and extensions at bootstrap, never tears a registry down.
    #[cfg(test)]
    pub(crate) fn reset(&self) {
        self.entries.write().expect("registry lock poisoned").clear();
    }
}
