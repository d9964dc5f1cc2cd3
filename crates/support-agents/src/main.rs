//! Support pipeline CLI.
//!
//! ```bash
//! echo '{"inquiry_text": "I forgot my password", "metadata": {...}}' | support-agents pipeline
//! support-agents --config support.toml monitor --input batch.json
//! support-agents agent knowledge_base_tool_agent --input query.json
//! ```

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use coordination::RequestFailure;
use support_agents::agents::default_registry;
use support_agents::{Orchestrator, SupportConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML config file overlaying the SUPPORT_* environment
    #[arg(long)]
    config: Option<PathBuf>,

    /// Append a JSONL audit record per request (overrides SUPPORT_AUDIT_LOG)
    #[arg(long)]
    audit_log: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify a TriageRequest
    Triage(InputArgs),
    /// Resolve a ResolutionRequest
    Resolve(InputArgs),
    /// Evaluate a MonitoringRequest against its SLA targets
    Monitor(InputArgs),
    /// Triage then resolve a TriageRequest
    Pipeline(InputArgs),
    /// Run the pipeline over a JSON array of TriageRequests
    Batch(InputArgs),
    /// Run any registered agent on a JSON query
    Agent {
        /// Registered agent name
        name: String,
        #[command(flatten)]
        input: InputArgs,
    },
    /// List registered agents and their contracts
    Agents,
}

#[derive(clap::Args, Debug)]
struct InputArgs {
    /// JSON input file (stdin when omitted)
    #[arg(long)]
    input: Option<PathBuf>,
}

fn read_input(path: Option<&Path>) -> Result<Value> {
    let text = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };
    serde_json::from_str(&text).context("Input is not valid JSON")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report<T: Serialize>(result: Result<T, RequestFailure>) -> Result<ExitCode> {
    match result {
        Ok(value) => {
            print_json(&value)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            print_json(&failure)?;
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let mut config = SupportConfig::load(args.config.as_deref())?;
    if args.audit_log.is_some() {
        config.audit_log = args.audit_log;
    }

    // Contract problems abort here, before any request is read.
    let registry = default_registry().context("Agent registry failed validation")?;
    info!(agents = registry.len(), engine = ?config.engine, "Support pipeline starting");
    let orchestrator = Orchestrator::from_config(&config, registry)?;

    match args.command {
        Command::Agents => {
            let listing: Vec<Value> = orchestrator
                .registry()
                .agents()
                .map(|agent| {
                    serde_json::json!({
                        "name": agent.name(),
                        "input_contract": agent.input_contract().map(|c| c.name.clone()),
                        "output_contract": agent.output_contract().name,
                        "tools": agent.tools().iter().map(|t| t.tool_name.clone()).collect::<Vec<_>>(),
                    })
                })
                .collect();
            print_json(&listing)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Triage(input) => {
            report(orchestrator.handle_triage(read_input(input.input.as_deref())?).await)
        }
        Command::Resolve(input) => {
            report(orchestrator.handle_resolution(read_input(input.input.as_deref())?).await)
        }
        Command::Monitor(input) => {
            report(orchestrator.handle_monitoring(read_input(input.input.as_deref())?).await)
        }
        Command::Pipeline(input) => {
            report(orchestrator.handle_pipeline(read_input(input.input.as_deref())?).await)
        }
        Command::Batch(input) => {
            report(orchestrator.handle_batch(read_input(input.input.as_deref())?).await)
        }
        Command::Agent { name, input } => {
            let query = read_input(input.input.as_deref())?;
            report(orchestrator.handle_agent(&name, query).await)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
