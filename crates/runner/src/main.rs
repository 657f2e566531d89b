use std::path::PathBuf;

use anyhow::Context;
use cep_pipeline::NodeRegistry;
use cep_runner::config::load_config;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "cep_runner", about = "Compile a CEP model and replay events through it")]
struct Args {
    /// Runner configuration file
    #[arg(long, default_value = "runner.toml")]
    config: PathBuf,

    /// Model definition, overriding the configuration
    #[arg(long)]
    model: Option<PathBuf>,

    /// JSON-lines event file, overriding the configuration
    #[arg(long)]
    events: Option<PathBuf>,

    /// Print the model's JSON export before compiling
    #[arg(long)]
    export_json: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = load_config(&args.config)?;
    if let Some(model) = args.model {
        config.model = model;
    }
    if let Some(events) = args.events {
        config.events = Some(events);
    }
    config.export_json |= args.export_json;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(config = %args.config.display(), "CEP runner starting...");

    let registry = NodeRegistry::with_builtins();
    let report = cep_runner::run(&config, &registry)
        .with_context(|| format!("Run of '{}' failed", config.model.display()))?;

    tracing::info!(model = %report.model, events = report.events, "CEP runner finished");
    Ok(())
}
