//! Provider Registry: provider name -> `createModel(config)` factory (§4.3, §4.5).

use std::sync::Arc;

use once_cell::sync::Lazy;

use super::Registry;
use crate::model::Provider;

static PROVIDERS: Lazy<Registry<Arc<dyn Provider>>> = Lazy::new(|| Registry::new("provider"));

pub fn register_provider(name: impl Into<String>, provider: Arc<dyn Provider>) {
    PROVIDERS.register(name, provider);
}

pub fn provider(name: &str) -> Option<Arc<dyn Provider>> {
    PROVIDERS.get(name)
}

pub fn provider_names() -> Vec<String> {
    PROVIDERS.names()
}

#[cfg(test)]
pub fn reset_provider_registry() {
    PROVIDERS.reset();
}
