//! Shared data types for the agentflow declarative workflow engine.
//!
//! This crate holds the core data model (§3): manifests, steps,
//! execution context, and the observability event schema — kept free of the executor,
//! registries, and I/O so that embedding applications can depend on the shapes without
//! pulling in `tokio` or the primitive implementations.

pub mod context;
pub mod error;
pub mod event;
pub mod manifest;

pub use context::Context;
pub use error::EngineError;
pub use event::{ErrorKind, Event, StepMeta};
pub use manifest::{Manifest, Metadata, ObservabilityConfig, Truthy, WorkflowStep};
