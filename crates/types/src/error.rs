//! Engine error taxonomy (§7).
//!
//! The core's propagation policy is fail-fast: no retries, no fallback substitution.
//! `EngineError` names the categories a caller might want to match on; everything that
//! doesn't fit a named category is carried as an opaque `Handler` error from an
//! extension or primitive.

use thiserror::Error;

/// Errors the core itself raises directly.
///
/// Handler-specific failures (provider errors, tool-binding errors, model errors) are
/// not required to use this type — §4.9 only asks that extension handlers distinguish
/// recoverable I/O failures (returned as a `Record` with `success: false`) from
/// programming errors (thrown/propagated). This enum exists so the loader, resolver,
/// and executor have a small, stable, matchable error surface of their own.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to parse manifest at {path}: {cause}")]
    Parse { path: String, cause: String },

    #[error("manifest validation failed: {reason}")]
    Validation { reason: String },

    #[error("unknown step type '{step_type}' for step '{step_id}'; registered types: {registered}")]
    UnknownStepType {
        step_id: String,
        step_type: String,
        registered: String,
    },

    #[error("reference error in step '{step_id}': {reason}")]
    Reference { step_id: String, reason: String },

    #[error("handler error in step '{step_id}': {source}")]
    Handler {
        step_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("streaming error in step '{step_id}': {source}")]
    Streaming {
        step_id: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Sanitized classification of an arbitrary error for trace events (§7).
///
/// The five-way taxonomy: `timeout`,
/// `auth_failed`, `validation`, `network`, `unknown`. Implemented against
/// `std::error::Error` (rather than `EngineError` alone) so extension handlers whose
/// errors are plain `anyhow::Error` chains still classify sensibly.
pub use crate::event::ErrorKind;
