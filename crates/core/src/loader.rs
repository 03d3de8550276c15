//! YAML manifest loader (C1).
//!
//! Reads a manifest from disk, parses it under a restricted tag set, and validates the
//! structural invariants from §3 before a [`Manifest`] is ever handed to the executor.
//! This is the attack surface closest to untrusted input — every downstream guarantee
//! (unique step ids, non-empty types, no executable payloads) depends on this module
//! refusing anything it can't account for.

use std::collections::HashSet;
use std::path::Path;

use agentflow_types::Manifest;
use anyhow::{Context as _, Result, bail};
use indexmap::IndexMap;
use serde::Deserialize;

/// Loads and validates a manifest from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, the document is not valid YAML, the
/// document uses a tag outside `{str, seq, map, null, bool, int, float}`, the top-level
/// document is not a mapping, `workflow` is missing or empty, or any step has a blank
/// `id`/`type`, a duplicate `id`, or references a step-result format that isn't a valid
/// identifier.
pub fn load_yaml(path: impl AsRef<Path>) -> Result<Manifest> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read manifest file: {}", path.display()))?;
    load_yaml_str(&raw).with_context(|| format!("failed to parse manifest file: {}", path.display()))
}

/// Loads and validates a manifest from an in-memory YAML document.
///
/// Exposed separately from [`load_yaml`] so tests and embedders that already have the
/// document in memory (e.g. fetched over the network by an external collaborator) don't
/// need to round-trip through a temp file.
pub fn load_yaml_str(source: &str) -> Result<Manifest> {
    let raw_value: serde_yaml::Value = serde_yaml::from_str(source).context("invalid YAML document")?;

    reject_unsafe_tags(&raw_value)?;

    if !matches!(raw_value, serde_yaml::Value::Mapping(_)) {
        bail!("manifest document must be a top-level mapping");
    }

    let manifest: Manifest = serde_yaml::from_value(raw_value).context("manifest does not match the expected shape")?;

    validate_manifest(&manifest)?;
    Ok(manifest)
}

/// Walks a parsed YAML value tree and rejects any node that used a custom tag.
///
/// `serde_yaml::Value` only ever produces `Tagged` nodes for tags beyond the core schema
/// (`str`, `seq`, `map`, `null`, `bool`, `int`, `float`); there is no way to reach
/// executable or language-specific constructs (e.g. `!!python/object`) through this
/// parser, but authors can still tag arbitrary scalars/collections (`!Secret value`).
/// Refusing every tagged node, rather than allow-listing specific tag names, keeps the
/// safe set exactly as small as §4.1 describes.
fn reject_unsafe_tags(value: &serde_yaml::Value) -> Result<()> {
    match value {
        serde_yaml::Value::Tagged(tagged) => {
            bail!("unsupported YAML tag '{}': only plain scalars, sequences, and mappings are allowed", tagged.tag)
        }
        serde_yaml::Value::Sequence(items) => {
            for item in items {
                reject_unsafe_tags(item)?;
            }
            Ok(())
        }
        serde_yaml::Value::Mapping(map) => {
            for (key, entry) in map {
                reject_unsafe_tags(key)?;
                reject_unsafe_tags(entry)?;
            }
            Ok(())
        }
        serde_yaml::Value::Null | serde_yaml::Value::Bool(_) | serde_yaml::Value::Number(_) | serde_yaml::Value::String(_) => Ok(()),
    }
}

/// A file containing one or more named manifests (§11, "Multi-workflow bundles").
///
/// Not part of the core data model — §3 describes a single manifest — this
/// exists purely as a loading-time convenience so `call-agent` and the CLI can resolve
/// a workflow by name out of a bundle, mirroring `WorkflowBundle` /
/// `parse_workflow_file`'s dual-format detection.
pub struct ManifestBundle {
    pub workflows: IndexMap<String, Manifest>,
}

impl ManifestBundle {
    pub fn get(&self, name: &str) -> Option<&Manifest> {
        self.workflows.get(name)
    }

    /// Returns the sole manifest when the bundle contains exactly one, regardless of
    /// its name — the common case for a file loaded with a single top-level
    /// `metadata`/`workflow` shape.
    pub fn single(&self) -> Option<&Manifest> {
        (self.workflows.len() == 1).then(|| self.workflows.values().next()).flatten()
    }
}

/// Loads a bundle from a YAML file, auto-detecting the single-workflow and
/// multi-workflow (`workflows:` map) document shapes.
pub fn load_yaml_bundle(path: impl AsRef<Path>) -> Result<ManifestBundle> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read manifest file: {}", path.display()))?;
    load_yaml_bundle_str(&raw).with_context(|| format!("failed to parse manifest file: {}", path.display()))
}

/// Loads a bundle from an in-memory YAML document.
///
/// Tries the multi-workflow shape first (mirroring `parse_workflow_file`, which
/// attempts multi-document parsing before falling back to single, to avoid silently
/// accepting a multi-document file as a single workflow with ignored fields), then
/// falls back to a single top-level manifest keyed by its own `metadata.name`.
pub fn load_yaml_bundle_str(source: &str) -> Result<ManifestBundle> {
    #[derive(Deserialize)]
    struct MultiManifestDocument {
        workflows: IndexMap<String, Manifest>,
    }

    let raw_value: serde_yaml::Value = serde_yaml::from_str(source).context("invalid YAML document")?;
    reject_unsafe_tags(&raw_value)?;
    if !matches!(raw_value, serde_yaml::Value::Mapping(_)) {
        bail!("manifest document must be a top-level mapping");
    }

    if let Ok(multi) = serde_yaml::from_value::<MultiManifestDocument>(raw_value.clone()) {
        for manifest in multi.workflows.values() {
            validate_manifest(manifest)?;
        }
        return Ok(ManifestBundle { workflows: multi.workflows });
    }

    let manifest: Manifest = serde_yaml::from_value(raw_value).context("manifest does not match the expected shape")?;
    validate_manifest(&manifest)?;
    let mut workflows = IndexMap::new();
    workflows.insert(manifest.metadata.name.clone(), manifest);
    Ok(ManifestBundle { workflows })
}

fn validate_manifest(manifest: &Manifest) -> Result<()> {
    if manifest.workflow.is_empty() {
        bail!("manifest 'workflow' must be a non-empty sequence");
    }

    let mut seen_ids = HashSet::with_capacity(manifest.workflow.len());
    for step in &manifest.workflow {
        if step.id.trim().is_empty() {
            bail!("every step must have a non-empty 'id'");
        }
        if step.step_type.trim().is_empty() {
            bail!("step '{}' must have a non-empty 'type'", step.id);
        }
        if !seen_ids.insert(step.id.as_str()) {
            bail!("duplicate step id '{}'", step.id);
        }
    }

    Ok(())
}
