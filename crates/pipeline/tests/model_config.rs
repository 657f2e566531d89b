//! Builds models from JSON definitions and runs them through the public API.

use cep_pipeline::cep_types::Event;
use cep_pipeline::stages::ChannelSink;
use cep_pipeline::{
    tolerance, CompileError, Compiler, CompilerKind, ConfigError, ModelConfig, NodeRegistry,
};

const PIPELINE: &str = r#"
{
    "name": "alerts",
    "sources": [
        { "name": "sensor", "class": "Replay", "attributes": [
            { "name": "reading", "type": "double" }
        ] }
    ],
    "processors": [
        {
            "name": "smooth",
            "type": "MovingAverage",
            "params": { "Window Size": 2 },
            "inputs": [ { "from": "sensor" } ]
        },
        {
            "name": "alert",
            "type": "Threshold",
            "params": { "threshold": 10.0 },
            "inputs": [ { "from": "smooth", "attribute": "average" } ]
        }
    ],
    "sinks": [
        { "name": "out", "type": "ChannelSink", "inputs": ["alert"] }
    ]
}
"#;

fn registry_with_channel() -> (NodeRegistry, flume::Receiver<Event>) {
    let mut registry = NodeRegistry::with_builtins();
    let (tx, rx) = flume::unbounded();
    registry.register_sink(ChannelSink::sink("Channel", tx));
    (registry, rx)
}

#[test]
fn test_config_driven_pipeline() {
    let (registry, results) = registry_with_channel();
    let config = ModelConfig::from_json(PIPELINE).unwrap();
    let model = config.build(&registry).unwrap();
    model.validate().unwrap();

    let runtime = CompilerKind::Embedded.create().compile(&model).unwrap();
    let sensor = runtime.source_by_name("sensor").unwrap().id;
    runtime.start().unwrap();
    for reading in [4.0, 8.0, 14.0, 20.0, 2.0] {
        runtime
            .send_event_from_source(Event::new().with("reading", reading), sensor)
            .unwrap();
    }
    runtime.shutdown();

    // Averages: 4, 6, 11, 17, 11
    let alerts: Vec<f64> = results
        .try_iter()
        .filter_map(|e| e.get_double("value"))
        .collect();
    assert_eq!(alerts, vec![11.0, 17.0, 11.0]);
}

#[test]
fn test_unknown_sink_type() {
    let config = ModelConfig::from_json(PIPELINE).unwrap();
    assert!(matches!(
        config.build(&NodeRegistry::with_builtins()),
        Err(ConfigError::UnknownSinkType(t)) if t == "ChannelSink"
    ));
}

#[test]
fn test_ambiguous_attribute_left_unselected() {
    let mut config = ModelConfig::from_json(PIPELINE).unwrap();
    config.sources[0].attributes.push(serde_json::from_value(serde_json::json!({
        "name": "quality", "type": "int"
    })).unwrap());
    let (registry, _results) = registry_with_channel();
    let model = config.build(&registry).unwrap();

    let err = CompilerKind::Embedded.create().compile(&model).unwrap_err();
    let CompileError::Failed(messages) = err else {
        panic!("expected per-node failures");
    };
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("Processor 'smooth'"), "{}", messages[0]);
}

#[test]
fn test_rebuilt_model_matches() {
    let (registry, _results) = registry_with_channel();
    let config = ModelConfig::from_json(PIPELINE).unwrap();
    let first = config.build(&registry).unwrap();
    let second = config.build(&registry).unwrap();
    assert_eq!(tolerance(&first, &second), 0.0);

    let mut changed = config.clone();
    changed.processors[1]
        .params
        .insert("threshold".to_string(), serde_json::json!(12.5));
    let third = changed.build(&registry).unwrap();
    assert!(tolerance(&first, &third) > 0.0);
}
