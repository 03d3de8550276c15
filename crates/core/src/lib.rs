//! `agentflow-core`: the declarative agent workflow engine (§2).
//!
//! Seven components, in dependency order: [`loader`] (C1, YAML), [`agentflow_types`]
//! re-exports the workflow model (C2), [`resolve`] (C3, variable resolution),
//! [`registry`] (C4, the four process-wide registries), [`executor`] (C5, the
//! sequential scheduler), [`primitives`] (C6, `llm`/`chat`/`output-generator`/
//! `call-agent`), and [`observability`] (C7, sanitized error classification — the
//! event model itself lives in `agentflow_types::event`).

pub mod executor;
pub mod handler;
pub mod loader;
pub mod message;
pub mod model;
pub mod observability;
pub mod primitives;
pub mod provider;
pub mod registry;
pub mod resolve;
pub mod stream;

pub use agentflow_types::{Context, EngineError, ErrorKind, Event, Manifest, Metadata, StepMeta, WorkflowStep};
pub use executor::{DEFAULT_CALL_AGENT_DEPTH_LIMIT, ExecuteOutcome, Executor, execute_manifest};
pub use handler::{HandlerOutput, StepHandler};
pub use loader::{ManifestBundle, load_yaml, load_yaml_bundle, load_yaml_bundle_str, load_yaml_str};
pub use stream::Response;
