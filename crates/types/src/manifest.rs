//! Agent manifest data model.
//!
//! A [`Manifest`] is the typed, in-memory shape of a parsed agent definition: metadata,
//! an ordered sequence of [`WorkflowStep`]s, and an optional `return` projection template.
//! Nothing in this module performs parsing or validation — see `agentflow_core::loader` for
//! the YAML-to-`Manifest` compiler that enforces the invariants documented here.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A fully parsed agent manifest.
///
/// Invariant: every step has a non-empty `id`, unique within the manifest, and a
/// non-empty `type`. The loader is responsible for enforcing this before a `Manifest`
/// is constructed; the executor trusts it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub metadata: Metadata,
    pub workflow: Vec<WorkflowStep>,
    /// Optional top-level projection applied to the accumulated variables after the
    /// last step completes. Arbitrary JSON shape with embedded `$`-prefixed variable
    /// references, resolved by the variable resolver.
    #[serde(default, rename = "return")]
    pub return_template: Option<Value>,
}

/// Manifest-level metadata.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Metadata {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub observability: Option<ObservabilityConfig>,
}

impl Metadata {
    /// Whether observability tracing is enabled, treating both boolean and string
    /// forms (`"true"`, `"1"`) as truthy per §4.4 step 1 of the executor contract.
    pub fn observability_enabled(&self) -> bool {
        self.observability.as_ref().is_some_and(ObservabilityConfig::is_enabled)
    }
}

/// Per-manifest observability toggle.
///
/// `enabled` is deserialized from either a YAML boolean or a YAML string so that
/// authors who write `enabled: "true"` are not silently ignored.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub enabled: Truthy,
}

impl ObservabilityConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled.0
    }
}

/// A boolean that also accepts common truthy/falsy string spellings on deserialize.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Truthy(pub bool);

impl<'de> Deserialize<'de> for Truthy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bool(bool),
            Str(String),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Bool(b) => Truthy(b),
            Raw::Str(s) => Truthy(matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")),
        })
    }
}

/// A single entry in the workflow sequence, bound to a handler by `type`.
///
/// Invariant: if a step's handler returns a streaming response, the pipeline
/// terminates there — any step declared after it in the manifest that would depend on
/// its `result` is unreachable at runtime. The loader does not attempt to statically
/// detect this (it would require handler-specific knowledge of which step types stream);
/// it is enforced dynamically by the executor's short-circuit behavior (§4.4 step 3e).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub id: String,
    #[serde(rename = "type")]
    pub step_type: String,
    /// Opaque, handler-specific configuration. Recognized keys are defined by the
    /// bound handler, not by the core.
    #[serde(default)]
    pub config: serde_json::Map<String, Value>,
    /// Name of the context variable that stores this step's non-streaming output.
    #[serde(default)]
    pub result: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_accepts_bool_and_string_forms() {
        let cfg: ObservabilityConfig = serde_json::from_value(serde_json::json!({"enabled": true})).unwrap();
        assert!(cfg.is_enabled());
        let cfg: ObservabilityConfig = serde_json::from_value(serde_json::json!({"enabled": "true"})).unwrap();
        assert!(cfg.is_enabled());
        let cfg: ObservabilityConfig = serde_json::from_value(serde_json::json!({"enabled": "false"})).unwrap();
        assert!(!cfg.is_enabled());
        let cfg = ObservabilityConfig::default();
        assert!(!cfg.is_enabled());
    }

    #[test]
    fn metadata_observability_enabled_defaults_false() {
        let metadata = Metadata {
            name: "a".into(),
            version: "1".into(),
            observability: None,
        };
        assert!(!metadata.observability_enabled());
    }
}
