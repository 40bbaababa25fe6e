// crates/nodalcli/src/main.rs

mod workflow_file;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use nodalcore::ExecutionEvent;
use nodalentities::{standard_entities, TelegramConfig, DEFAULT_TELEGRAM_API};
use nodalruntime::{EntityRegistry, NodalRunner, RunOptions, RunnerOptions, RuntimeConfig};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nodal")]
#[command(about = "Nodal workflow runner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow file
    Run {
        /// Path to workflow JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Fail a node that runs longer than this
        #[arg(long)]
        node_timeout_ms: Option<u64>,

        /// Abort the run on the first failing node instead of skipping it
        #[arg(long)]
        stop_on_error: bool,

        #[command(flatten)]
        telegram: TelegramArgs,
    },

    /// Validate a workflow file
    Validate {
        /// Path to workflow JSON file
        file: PathBuf,
    },

    /// List available entities
    Entities,

    /// Create a new example workflow
    Init {
        /// Output file path
        #[arg(short, long, default_value = "workflow.json")]
        output: PathBuf,
    },
}

#[derive(clap::Args)]
struct TelegramArgs {
    /// Telegram bot token
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    telegram_token: Option<String>,

    /// Telegram Bot API base URL
    #[arg(long, env = "TELEGRAM_API_BASE", default_value = DEFAULT_TELEGRAM_API)]
    telegram_api_base: String,
}

impl From<TelegramArgs> for TelegramConfig {
    fn from(args: TelegramArgs) -> Self {
        TelegramConfig {
            api_base: args.telegram_api_base,
            token: args.telegram_token,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            verbose,
            node_timeout_ms,
            stop_on_error,
            telegram,
        } => {
            init_logging(verbose);

            let mut config = RuntimeConfig::default();
            if let Some(ms) = node_timeout_ms {
                config = config.with_node_timeout(Duration::from_millis(ms));
            }
            run_workflows(file, config, telegram.into(), stop_on_error).await?;
        }

        Commands::Validate { file } => {
            validate_workflows(file)?;
        }

        Commands::Entities => {
            list_entities();
        }

        Commands::Init { output } => {
            create_example_workflow(output)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

async fn run_workflows(
    file: PathBuf,
    config: RuntimeConfig,
    telegram: TelegramConfig,
    stop_on_error: bool,
) -> Result<()> {
    println!("🚀 Loading workflows from: {}", file.display());
    let workflows = workflow_file::load_workflows(&file)?;

    let runner = NodalRunner::new(
        RunnerOptions::new(standard_entities(telegram)).with_config(config),
    );

    for workflow in workflows {
        println!("📋 Workflow: {} ({} nodes)", workflow.label(), workflow.len());
        runner.add_workflow(workflow);
    }
    println!();

    // Subscribe to events for real-time output
    let mut events = runner.subscribe_events();
    let event_task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => print_event(event),
                Err(RecvError::Lagged(skipped)) => {
                    println!("  ⚠️  {} events dropped", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut options = RunOptions::new();
    if !stop_on_error {
        options = options.on_error(|error, node| {
            eprintln!("  ❌ Error executing node '{}': {}", node.name, error);
        });
    }

    let outcome = runner.run(options)?.wait().await;

    // Wait for events to finish printing
    tokio::time::sleep(Duration::from_millis(100)).await;
    event_task.abort();

    println!();
    println!("📤 Final state:");
    println!("{}", serde_json::to_string_pretty(&runner.current_state())?);

    outcome.context("Workflow run failed")
}

fn print_event(event: ExecutionEvent) {
    match event {
        ExecutionEvent::RunStarted {
            queued_workflows, ..
        } => {
            println!("▶️  Run started ({} workflows)", queued_workflows);
        }
        ExecutionEvent::WorkflowStarted {
            workflow_index,
            name,
            ..
        } => {
            println!(
                "  📋 Workflow {} {}",
                workflow_index,
                name.unwrap_or_default()
            );
        }
        ExecutionEvent::NodeStarted {
            node_name,
            entity,
            method,
            ..
        } => {
            println!("    ⚡ {} ({}.{})", node_name, entity, method);
        }
        ExecutionEvent::NodeCompleted {
            node_index,
            duration_ms,
            ..
        } => {
            println!("    ✅ Node {} completed in {}ms", node_index, duration_ms);
        }
        ExecutionEvent::NodeFailed {
            node_index,
            error,
            recovered,
            ..
        } => {
            let outcome = if recovered { "skipped" } else { "aborting" };
            println!("    ❌ Node {} failed ({}): {}", node_index, outcome, error);
        }
        ExecutionEvent::RunCompleted { duration_ms, .. } => {
            println!("✨ Workflows completed successfully in {}ms", duration_ms);
        }
        ExecutionEvent::RunFaulted {
            error, duration_ms, ..
        } => {
            println!("💥 Run failed after {}ms: {}", duration_ms, error);
        }
    }
}

fn standard_registry() -> EntityRegistry {
    EntityRegistry::with_entities(standard_entities(TelegramConfig::default()))
}

fn validate_workflows(file: PathBuf) -> Result<()> {
    println!("🔍 Validating workflows: {}", file.display());

    let workflows = workflow_file::load_workflows(&file)?;
    let registry = standard_registry();

    let mut unresolved = 0;
    for (location, node) in workflow_file::all_nodes(&workflows) {
        if !registry.contains(&node.entity, &node.method) {
            unresolved += 1;
            println!(
                "  ❌ {} '{}': unknown {}.{}",
                location, node.name, node.entity, node.method
            );
        }
    }

    if unresolved > 0 {
        bail!("{} node(s) reference unknown entities or methods", unresolved);
    }

    println!("✅ Workflows are valid:");
    for workflow in &workflows {
        println!("   {} ({} nodes)", workflow.label(), workflow.len());
    }

    Ok(())
}

fn list_entities() {
    println!("📦 Available Entities:");
    println!();

    let registry = standard_registry();
    for name in registry.entity_names() {
        if let Some(entity) = registry.get(name) {
            println!("  • {}", name);
            for method in entity.method_names() {
                println!("    - {}", method);
            }
        }
    }
}

fn create_example_workflow(output: PathBuf) -> Result<()> {
    let workflow = workflow_file::example_workflow()?;

    let json = serde_json::to_string_pretty(&workflow)?;
    std::fs::write(&output, json)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("✨ Created example workflow: {}", output.display());
    println!();
    println!("Run it with:");
    println!(
        "  TELEGRAM_BOT_TOKEN=... nodal run --file {}",
        output.display()
    );

    Ok(())
}
