use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

use cep_pipeline::stages::ChannelSink;
use cep_pipeline::{CompilerKind, NodeRegistry};

use crate::config::{load_config, RunnerConfig, DEFAULT_LOG_FILTER};
use crate::run;

const MODEL: &str = r#"
{
    "name": "sma",
    "sources": [
        { "name": "ticks", "class": "Replay", "attributes": [ { "name": "price", "type": "double" } ] }
    ],
    "processors": [
        { "name": "avg", "type": "MovingAverage", "params": { "window_size": 2 },
          "inputs": [ { "from": "ticks", "attribute": "price" } ] }
    ],
    "sinks": [
        { "name": "out", "type": "ChannelSink", "inputs": ["avg"] }
    ]
}
"#;

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("Failed to write test file");
    path
}

#[test]
fn test_parse_full_config() {
    let config = RunnerConfig::from_toml(
        r#"
        model = "models/sma.json"
        events = "models/sma_events.jsonl"
        compiler = "embedded"
        log_filter = "cep_pipeline=debug"
        export_json = true
        "#,
    )
    .unwrap();
    assert_eq!(config.model, PathBuf::from("models/sma.json"));
    assert_eq!(config.events, Some(PathBuf::from("models/sma_events.jsonl")));
    assert_eq!(config.compiler, CompilerKind::Embedded);
    assert_eq!(config.log_filter(), "cep_pipeline=debug");
    assert!(config.export_json);
}

#[test]
fn test_defaults() {
    let config = RunnerConfig::from_toml(r#"model = "m.json""#).unwrap();
    assert_eq!(config, RunnerConfig::new("m.json"));
    assert_eq!(config.log_filter(), DEFAULT_LOG_FILTER);
}

#[test]
fn test_unknown_compiler_rejected() {
    let result = RunnerConfig::from_toml(
        r#"
        model = "m.json"
        compiler = "distributed"
        "#,
    );
    assert!(result.is_err());
}

#[test]
fn test_missing_config_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    let err = load_config(&dir.path().join("runner.toml")).unwrap_err();
    assert!(err.to_string().contains("Could not read runner configuration"));
}

#[test]
fn test_paths_relative_to_config_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = write(
        dir.path(),
        "runner.toml",
        "model = \"sma.json\"\nevents = \"/data/events.jsonl\"\n",
    );
    let config = load_config(&path).unwrap();
    assert_eq!(config.model, dir.path().join("sma.json"));
    assert_eq!(config.events, Some(PathBuf::from("/data/events.jsonl")));
}

#[test]
fn test_run_replays_events() {
    let dir = tempdir().expect("Failed to create temp dir");
    write(dir.path(), "sma.json", MODEL);
    write(
        dir.path(),
        "events.jsonl",
        "# prices\n{\"source\": \"ticks\", \"data\": {\"price\": 2}}\n\n{\"source\": \"ticks\", \"data\": {\"price\": 4}}\n",
    );
    let path = write(
        dir.path(),
        "runner.toml",
        "model = \"sma.json\"\nevents = \"events.jsonl\"\n",
    );

    let mut registry = NodeRegistry::with_builtins();
    let (tx, rx) = flume::unbounded();
    registry.register_sink(ChannelSink::sink("Channel", tx));

    let report = run(&load_config(&path).unwrap(), &registry).unwrap();
    assert_eq!(report.model, "sma");
    assert_eq!(report.events, 2);
    let averages: Vec<f64> = rx.try_iter().filter_map(|e| e.get_double("average")).collect();
    assert_eq!(averages, vec![2.0, 3.0]);
}

#[test]
fn test_run_rejects_unknown_source() {
    let dir = tempdir().expect("Failed to create temp dir");
    let model = write(dir.path(), "sma.json", MODEL);
    let events = write(
        dir.path(),
        "events.jsonl",
        "{\"source\": \"quotes\", \"data\": {\"price\": 2}}\n",
    );
    let mut config = RunnerConfig::new(model);
    config.events = Some(events);

    let mut registry = NodeRegistry::with_builtins();
    let (tx, _rx) = flume::unbounded();
    registry.register_sink(ChannelSink::sink("Channel", tx));

    let err = run(&config, &registry).unwrap_err();
    assert!(format!("{err:#}").contains("unknown source 'quotes'"), "{err:#}");
}

#[test]
fn test_shipped_sample_builds() {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    let config = load_config(&manifest.join("runner.toml")).unwrap();
    let model = crate::load_model(&config.model, &NodeRegistry::with_builtins()).unwrap();
    assert_eq!(model.name(), "price_alerts");
    assert!(model.validate().is_ok());
    assert!(config.events.map_or(false, |p| p.exists()));
}
