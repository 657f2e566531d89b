//! JSON export of a processing model, one JSON document per node.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::graph::ProcessingModel;
use crate::node::{Node, NodeId, NodeKind};
use crate::parameter::Parameters;

/// Exported form of a single node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeJson {
    pub class_name: String,
    pub proc_id: NodeId,
    pub name: String,
    pub author_email: Option<String>,
    pub description: String,
    pub proc_type: NodeKind,
    /// Parameter values keyed by normalized parameter name
    pub params: BTreeMap<String, serde_json::Value>,
}

impl NodeJson {
    fn of(node: &dyn Node, class_name: &str) -> Self {
        let meta = node.meta();
        Self {
            class_name: class_name.to_string(),
            proc_id: node.id(),
            name: meta.name.clone(),
            author_email: meta.author_email.clone(),
            description: meta.description.clone(),
            proc_type: node.kind(),
            params: params_json(node.parameters()),
        }
    }
}

/// Exported form of a whole model. Nodes are kept as serialized strings so
/// two exports can be compared as sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelJson {
    pub model_name: String,
    pub sources: BTreeSet<String>,
    pub processors: BTreeSet<String>,
    pub sinks: BTreeSet<String>,
}

fn params_json(parameters: &Parameters) -> BTreeMap<String, serde_json::Value> {
    parameters
        .iter()
        .map(|p| (p.normalized_name(), p.value().to_json()))
        .collect()
}

fn encode(nodes: impl Iterator<Item = NodeJson>) -> serde_json::Result<BTreeSet<String>> {
    nodes.map(|node| serde_json::to_string(&node)).collect()
}

impl ProcessingModel {
    pub fn export(&self) -> serde_json::Result<ModelJson> {
        Ok(ModelJson {
            model_name: self.name().to_string(),
            sources: encode(
                self.external_sources()
                    .map(|s| NodeJson::of(s, s.class_name())),
            )?,
            processors: encode(self.processors().map(|p| NodeJson::of(p, p.class_name())))?,
            sinks: encode(self.external_sinks().map(|s| NodeJson::of(s, s.class_name())))?,
        })
    }

    /// Pretty-printed [`ModelJson`] document.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.export()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::normalize_name;
    use crate::registry::NodeRegistry;
    use crate::source::ExternalSource;
    use cep_types::{Attribute, ValueType};

    #[test]
    fn test_parameter_names_normalized() {
        assert_eq!(normalize_name("Moving Average"), "moving_average");
        assert_eq!(normalize_name("Window Size (n)"), "window_size_n");
    }

    #[test]
    fn test_model_export() {
        let registry = NodeRegistry::with_builtins();
        let mut model = ProcessingModel::new("export");
        let source = ExternalSource::new("ticks", "Replay")
            .with_attribute(Attribute::new("price", ValueType::Double));
        let source_id = source.id();
        let processor = registry.create_processor("MovingAverage", "avg").unwrap();
        let processor_id = processor.id();
        model.add_external_source(source);
        model.add_processor(processor);

        let json: serde_json::Value = serde_json::from_str(&model.to_json().unwrap()).unwrap();
        assert_eq!(json["modelName"], "export");
        assert_eq!(json["sinks"].as_array().map(Vec::len), Some(0));

        let processors = json["processors"].as_array().unwrap();
        assert_eq!(processors.len(), 1);
        let node: NodeJson = serde_json::from_str(processors[0].as_str().unwrap()).unwrap();
        assert_eq!(node.class_name, "MovingAverage");
        assert_eq!(node.proc_id, processor_id);
        assert_eq!(node.proc_type, NodeKind::Processor);
        assert_eq!(node.params.get("window_size"), Some(&serde_json::json!(3)));

        let exported = model.export().unwrap();
        let source_json: NodeJson =
            serde_json::from_str(exported.sources.iter().next().unwrap()).unwrap();
        assert_eq!(source_json.proc_id, source_id);
        assert_eq!(source_json.proc_type, NodeKind::Source);
        assert!(source_json.params.is_empty());
    }
}
