//! Loads a model definition, compiles it and replays recorded events into it.

pub mod config;
pub mod replay;

#[cfg(test)]
mod config_test;

use anyhow::Context;
use cep_pipeline::{Compiler, ModelConfig, NodeRegistry, ProcessingModel};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

use crate::config::RunnerConfig;

/// Outcome of one [`run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub model: String,
    pub events: usize,
}

pub fn load_model(path: &Path, registry: &NodeRegistry) -> anyhow::Result<ProcessingModel> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read model definition at '{}'", path.display()))?;
    let definition = ModelConfig::from_json(&contents)
        .with_context(|| format!("Could not parse model definition '{}'", path.display()))?;
    let model = definition
        .build(registry)
        .with_context(|| format!("Could not build model '{}'", definition.name))?;
    Ok(model)
}

/// Builds, compiles and starts the configured model, replays the event file
/// if one is configured and shuts the runtime down.
pub fn run(config: &RunnerConfig, registry: &NodeRegistry) -> anyhow::Result<RunReport> {
    let model = load_model(&config.model, registry)?;
    if config.export_json {
        println!("{}", model.to_json()?);
    }

    let compiler = config.compiler.create();
    let runtime = compiler
        .compile(&model)
        .with_context(|| format!("Could not compile model '{}'", model.name()))?;
    runtime.start()?;
    info!(model = %model.name(), compiler = %config.compiler, "model running");

    let events = match &config.events {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Could not open event file '{}'", path.display()))?;
            replay::replay(&runtime, BufReader::new(file))?
        }
        None => 0,
    };
    runtime.shutdown();

    Ok(RunReport {
        model: model.name().to_string(),
        events,
    })
}
