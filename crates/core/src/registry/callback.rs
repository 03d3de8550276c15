//! Callback Registry: lifecycle hook name -> implementation supplied by the embedding
//! application (§4.3, §4.6).
//!
//! Names referenced from YAML (`onFinish: myHook`) that aren't registered are logged
//! and ignored rather than treated as an error — see §4.6: "Callback names that are
//! not in the Callback Registry are logged and ignored."

use std::sync::Arc;

use once_cell::sync::Lazy;

use super::Registry;
use crate::model::Callback;

static CALLBACKS: Lazy<Registry<Arc<dyn Callback>>> = Lazy::new(|| Registry::new("callback"));

pub fn register_callback(name: impl Into<String>, callback: Arc<dyn Callback>) {
    CALLBACKS.register(name, callback);
}

pub fn callback(name: &str) -> Option<Arc<dyn Callback>> {
    CALLBACKS.get(name)
}

pub fn callback_names() -> Vec<String> {
    CALLBACKS.names()
}

#[cfg(test)]
pub fn reset_callback_registry() {
    CALLBACKS.reset();
}
