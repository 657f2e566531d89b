//! Declarative model definitions and serialization

use cep_types::{Attribute, Value, ValueType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info};

use crate::error::{ConfigError, ValidationError};
use crate::graph::ProcessingModel;
use crate::io::Source;
use crate::node::{Node, NodeId};
use crate::registry::NodeRegistry;
use crate::source::ExternalSource;

/// Parameter values by parameter name (display or normalized form).
pub type NodeParams = BTreeMap<String, serde_json::Value>;

/// Complete model definition. Nodes reference each other by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Configuration format version
    #[serde(default = "default_version")]
    pub version: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub processors: Vec<ProcessorConfig>,
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_source_class() -> String {
    "External".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: ValueType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    /// Connector class feeding this source
    #[serde(rename = "class", default = "default_source_class")]
    pub class_name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub attributes: Vec<AttributeConfig>,
}

/// One processor input: the node it reads from and the attribute it selects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    pub from: String,
    /// Defaults to the only attribute of the source, if it has exactly one.
    #[serde(default)]
    pub attribute: Option<String>,
}

/// Equality join between two inputs, by position in the input list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JoinConfig {
    pub left: usize,
    pub right: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    pub name: String,
    /// Registered processor class
    #[serde(rename = "type")]
    pub processor_type: String,
    #[serde(default)]
    pub params: NodeParams,
    #[serde(default)]
    pub inputs: Vec<InputConfig>,
    #[serde(default)]
    pub joins: Vec<JoinConfig>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkConfig {
    pub name: String,
    /// Registered sink class
    #[serde(rename = "type")]
    pub sink_type: String,
    #[serde(default)]
    pub params: NodeParams,
    /// Names of the nodes feeding each input, in input order
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ModelConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: default_version(),
            name: name.into(),
            description: None,
            sources: Vec::new(),
            processors: Vec::new(),
            sinks: Vec::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks names are unique and every reference resolves to a source or
    /// processor. Does not look at the registry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        let all_names = self
            .sources
            .iter()
            .map(|s| &s.name)
            .chain(self.processors.iter().map(|p| &p.name))
            .chain(self.sinks.iter().map(|s| &s.name));
        for name in all_names {
            if !names.insert(name.as_str()) {
                return Err(ConfigError::DuplicateName(name.clone()));
            }
        }

        let producers: HashSet<&str> = self
            .sources
            .iter()
            .map(|s| s.name.as_str())
            .chain(self.processors.iter().map(|p| p.name.as_str()))
            .collect();
        let check = |node: &str, reference: &str| {
            if producers.contains(reference) {
                Ok(())
            } else {
                Err(ConfigError::UnknownReference {
                    node: node.to_string(),
                    reference: reference.to_string(),
                })
            }
        };

        for processor in &self.processors {
            for input in &processor.inputs {
                check(&processor.name, &input.from)?;
            }
            for join in &processor.joins {
                let in_range = |i: usize| i < processor.inputs.len();
                if join.left == join.right || !in_range(join.left) || !in_range(join.right) {
                    return Err(ValidationError::InvalidJoin {
                        processor: processor.name.clone(),
                        message: format!("inputs {} and {} cannot be joined", join.left, join.right),
                    }
                    .into());
                }
            }
        }
        for sink in &self.sinks {
            for input in &sink.inputs {
                check(&sink.name, input)?;
            }
        }
        Ok(())
    }

    /// Instantiates registry templates and wires them into a new model.
    pub fn build(&self, registry: &NodeRegistry) -> Result<ProcessingModel, ConfigError> {
        self.validate()?;
        let mut model = ProcessingModel::new(&self.name);
        let mut ids: HashMap<&str, NodeId> = HashMap::new();

        for config in &self.sources {
            let mut source = ExternalSource::new(&config.name, &config.class_name);
            if let Some(description) = &config.description {
                source.meta_mut().description = description.clone();
            }
            let id = source.id();
            model.add_external_source(source);
            for attribute in &config.attributes {
                model.add_output_attribute(id, Attribute::new(&attribute.name, attribute.value_type))?;
            }
            ids.insert(&config.name, id);
        }

        let mut processor_inputs: Vec<(NodeId, Vec<NodeId>)> = Vec::new();
        for config in &self.processors {
            let mut processor = registry.create_processor(&config.processor_type, &config.name)?;
            if let Some(description) = &config.description {
                processor.meta_mut().description = description.clone();
            }
            apply_params(processor.meta_mut(), &config.params)?;
            if processor.inputs().len() != config.inputs.len() {
                return Err(ConfigError::InputCountMismatch {
                    node: config.name.clone(),
                    declared: processor.inputs().len(),
                    configured: config.inputs.len(),
                });
            }
            let id = processor.id();
            processor_inputs.push((id, processor.inputs().iter().map(Node::id).collect()));
            model.add_processor(processor);
            ids.insert(&config.name, id);
        }

        // Wire after every producer exists, processors may read from later ones.
        for (config, (id, inputs)) in self.processors.iter().zip(&processor_inputs) {
            for (input_config, input) in config.inputs.iter().zip(inputs) {
                let source = ids[input_config.from.as_str()];
                model.connect(*id, *input, source)?;
                let attribute = match &input_config.attribute {
                    Some(attribute) => Some(attribute.clone()),
                    None => only_attribute(&model, source),
                };
                if let Some(attribute) = attribute {
                    model.set_source_attribute(*id, *input, &attribute)?;
                }
            }
            for join in &config.joins {
                model.add_join(*id, inputs[join.left], inputs[join.right])?;
            }
        }

        for config in &self.sinks {
            let mut sink = registry.create_sink(&config.sink_type, &config.name)?;
            if let Some(description) = &config.description {
                sink.meta_mut().description = description.clone();
            }
            apply_params(sink.meta_mut(), &config.params)?;
            if sink.inputs().len() != config.inputs.len() {
                return Err(ConfigError::InputCountMismatch {
                    node: config.name.clone(),
                    declared: sink.inputs().len(),
                    configured: config.inputs.len(),
                });
            }
            let id = sink.id();
            let inputs: Vec<NodeId> = sink.inputs().iter().map(Node::id).collect();
            model.add_external_sink(sink);
            for (from, input) in config.inputs.iter().zip(inputs) {
                model.connect(id, input, ids[from.as_str()])?;
            }
        }

        info!(
            model = %self.name,
            sources = self.sources.len(),
            processors = self.processors.len(),
            sinks = self.sinks.len(),
            "built processing model"
        );
        Ok(model)
    }
}

fn apply_params(meta: &mut crate::node::NodeMeta, params: &NodeParams) -> Result<(), ConfigError> {
    for (name, value) in params {
        debug!(node = %meta.name, parameter = %name, %value, "setting parameter");
        meta.set_parameter(name, Value::from(value.clone()))?;
    }
    Ok(())
}

fn only_attribute(model: &ProcessingModel, source: NodeId) -> Option<String> {
    let output = match model.external_source(source) {
        Some(s) => s.output(),
        None => model.processor(source)?.output(),
    };
    match output.event_type().attributes() {
        [only] => Some(only.name().to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMA: &str = r#"
    {
        "version": "1.0",
        "name": "sma",
        "sources": [
            { "name": "ticks", "class": "Replay", "attributes": [ { "name": "price", "type": "double" } ] }
        ],
        "processors": [
            {
                "name": "avg",
                "type": "MovingAverage",
                "params": { "window_size": 5 },
                "inputs": [ { "from": "ticks", "attribute": "price" } ]
            }
        ],
        "sinks": [
            { "name": "log", "type": "LogSink", "inputs": ["avg"] }
        ]
    }
    "#;

    #[test]
    fn test_build_from_json() {
        let config = ModelConfig::from_json(SMA).unwrap();
        let model = config.build(&NodeRegistry::with_builtins()).unwrap();
        assert_eq!(model.name(), "sma");
        assert_eq!(model.len(), 3);
        assert!(model.validate().is_ok());

        let avg = model.find("avg").and_then(|id| model.processor(id)).unwrap();
        assert_eq!(avg.parameters().long("Window Size"), Some(5));
        assert_eq!(
            avg.inputs()[0].source_attribute().map(Attribute::name),
            Some("price")
        );
    }

    #[test]
    fn test_json_round_trip() {
        let config = ModelConfig::from_json(SMA).unwrap();
        let again = ModelConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(again, config);
    }

    #[test]
    fn test_unknown_reference() {
        let mut config = ModelConfig::from_json(SMA).unwrap();
        config.sinks[0].inputs = vec!["nowhere".to_string()];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownReference { .. })
        ));
    }

    #[test]
    fn test_sink_cannot_be_referenced() {
        let mut config = ModelConfig::from_json(SMA).unwrap();
        config.processors[0].inputs[0].from = "log".to_string();
        assert!(matches!(
            config.build(&NodeRegistry::with_builtins()),
            Err(ConfigError::UnknownReference { .. })
        ));
    }

    #[test]
    fn test_duplicate_name() {
        let mut config = ModelConfig::from_json(SMA).unwrap();
        config.sinks[0].name = "ticks".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::DuplicateName(n)) if n == "ticks"));
    }

    #[test]
    fn test_input_count_mismatch() {
        let mut config = ModelConfig::from_json(SMA).unwrap();
        config.processors[0].inputs.push(InputConfig {
            from: "ticks".to_string(),
            attribute: None,
        });
        assert!(matches!(
            config.build(&NodeRegistry::with_builtins()),
            Err(ConfigError::InputCountMismatch {
                declared: 1,
                configured: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_bad_parameter_value() {
        let mut config = ModelConfig::from_json(SMA).unwrap();
        config.processors[0]
            .params
            .insert("Window Size".to_string(), serde_json::json!("wide"));
        assert!(matches!(
            config.build(&NodeRegistry::with_builtins()),
            Err(ConfigError::Validation(ValidationError::InvalidParameter { .. }))
        ));
    }

    #[test]
    fn test_unknown_processor_type() {
        let mut config = ModelConfig::from_json(SMA).unwrap();
        config.processors[0].processor_type = "Kalman".to_string();
        assert!(matches!(
            config.build(&NodeRegistry::with_builtins()),
            Err(ConfigError::UnknownProcessorType(_))
        ));
    }
}
