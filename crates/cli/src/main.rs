//! `agentflow`: a single-shot local harness for running a manifest (§6, "host-provided
//! transport", reduced to a CLI rather than an HTTP server — HTTP transport is
//! explicitly out of scope for the core, §1).
//!
//! Loads a manifest (or bundle, §11), resolves `input` from a JSON file or stdin,
//! registers the core primitives and the MCP tool bridge, executes blocking, and
//! prints the result. Streaming results are rendered as newline-delimited JSON
//! chunks, since a terminal has no notion of a UI-message stream.

use std::io::Read as _;
use std::path::{Path, PathBuf};

use agentflow_core::loader::load_yaml_bundle;
use agentflow_core::primitives::call_agent::{AgentLocator, set_agent_locator};
use agentflow_core::{ExecuteOutcome, Executor, primitives, provider::http::HttpProvider, registry};
use anyhow::{Context, Result, bail};
use clap::Parser;
use futures_util::StreamExt;

/// Run an agentflow manifest once against a given input and print the result.
#[derive(Parser, Debug)]
#[command(name = "agentflow", version, about)]
struct Args {
    /// Path to a manifest YAML file (single workflow or a `workflows:` bundle).
    #[arg(long)]
    manifest: PathBuf,

    /// Workflow name to run when `manifest` is a multi-workflow bundle. Required
    /// unless the bundle contains exactly one workflow.
    #[arg(long)]
    workflow: Option<String>,

    /// Path to a JSON file providing the execution input, or `-` to read from
    /// stdin. Defaults to `{}` when omitted.
    #[arg(long)]
    input: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    primitives::register_builtins();
    agentflow_mcp::register_bridge();
    register_example_provider();
    set_agent_locator(std::sync::Arc::new(ManifestRelativeLocator { base_dir: base_dir_of(&args.manifest) }));

    let bundle = load_yaml_bundle(&args.manifest).with_context(|| format!("loading manifest {}", args.manifest.display()))?;
    let manifest = match (&args.workflow, bundle.single()) {
        (Some(name), _) => bundle.get(name).with_context(|| format!("no workflow named '{name}' in {}", args.manifest.display()))?.clone(),
        (None, Some(manifest)) => manifest.clone(),
        (None, None) => bail!("manifest contains multiple workflows; pass --workflow to select one"),
    };

    let input = resolve_input(args.input.as_deref())?;
    let executor = Executor::new(manifest);

    match executor.execute(input).await? {
        ExecuteOutcome::Record(record) => {
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        ExecuteOutcome::Response(response) => {
            let mut stream = response.stream;
            while let Some(chunk) = stream.next().await {
                println!("{}", serde_json::to_string(&chunk)?);
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn resolve_input(source: Option<&str>) -> Result<serde_json::Value> {
    match source {
        None => Ok(serde_json::json!({})),
        Some("-") => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer).context("reading input from stdin")?;
            serde_json::from_str(&buffer).context("parsing stdin input as JSON")
        }
        Some(path) => {
            let raw = std::fs::read_to_string(path).with_context(|| format!("reading input file {path}"))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing {path} as JSON"))
        }
    }
}

fn base_dir_of(manifest_path: &Path) -> PathBuf {
    manifest_path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."))
}

/// Registers a single OpenAI-Chat-Completions-shaped provider under the name
/// `openai`, reading its key from `OPENAI_API_KEY` (§10.3: credentials are resolved
/// lazily inside provider implementations, never read by the core itself). Harmless
/// to register even when the environment variable is unset — the error surfaces only
/// if a step actually tries to use the provider.
fn register_example_provider() {
    registry::register_provider("openai", std::sync::Arc::new(HttpProvider::new("https://api.openai.com/v1", "OPENAI_API_KEY")));
}

/// Resolves `call-agent`'s `agentId` to `<manifest's directory>/<agentId>.yaml`, the
/// simplest locator convention for a local, single-shot harness. Agent discovery
/// beyond this single-hop lookup is out of scope for the core (§1); a transport-aware
/// embedder substitutes its own `AgentLocator`.
struct ManifestRelativeLocator {
    base_dir: PathBuf,
}

impl AgentLocator for ManifestRelativeLocator {
    fn resolve(&self, agent_id: &str) -> Result<PathBuf> {
        Ok(self.base_dir.join(format!("{agent_id}.yaml")))
    }
}
