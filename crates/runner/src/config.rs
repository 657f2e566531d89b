use anyhow::Context;
use cep_pipeline::CompilerKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_LOG_FILTER: &str = "cep_runner=info,cep_pipeline=info";

/// Configuration for the runner
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// JSON model definition
    pub model: PathBuf,
    /// JSON-lines event file replayed into the model
    #[serde(default)]
    pub events: Option<PathBuf>,
    /// Compiler used to turn the model into a runtime
    #[serde(default)]
    pub compiler: CompilerKind,
    /// Tracing filter used when `RUST_LOG` is not set
    #[serde(default)]
    pub log_filter: Option<String>,
    /// Print the model's JSON export before compiling
    #[serde(default)]
    pub export_json: bool,
}

impl RunnerConfig {
    pub fn new(model: impl Into<PathBuf>) -> Self {
        Self {
            model: model.into(),
            events: None,
            compiler: CompilerKind::default(),
            log_filter: None,
            export_json: false,
        }
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        toml::from_str(contents).context("Could not parse runner configuration")
    }

    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    /// Makes relative paths relative to `base` instead of the working directory.
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        resolve(&mut self.model);
        if let Some(events) = self.events.as_mut() {
            resolve(events);
        }
    }
}

/// Loads the runner configuration at `path`. Relative paths inside it are
/// taken relative to the file's directory.
pub fn load_config(path: &Path) -> anyhow::Result<RunnerConfig> {
    let contents = std::fs::read_to_string(path).with_context(|| {
        format!("Could not read runner configuration at '{}'", path.display())
    })?;
    let mut config = RunnerConfig::from_toml(&contents)
        .with_context(|| format!("Invalid runner configuration '{}'", path.display()))?;
    if let Some(base) = path.parent() {
        config.resolve_paths(base);
    }
    tracing::debug!(path = %path.display(), ?config, "loaded runner configuration");
    Ok(config)
}
