//! The processing model: an arena of nodes plus an index of who reads from whom.

use cep_types::{Attribute, Value};
use chrono::{DateTime, Utc};
use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use slab::Slab;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use crate::error::{ValidationError, ValidationResult};
use crate::io::{Output, Source};
use crate::node::{Node, NodeId, NodeKind};
use crate::processor::Processor;
use crate::sink::ExternalSink;
use crate::source::ExternalSource;

/// An input of a processor or sink, addressed through its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InputRef {
    pub owner: NodeId,
    pub input: NodeId,
}

#[derive(Debug, Clone)]
enum Slot {
    Source(ExternalSource),
    Processor(Processor),
    Sink(ExternalSink),
}

impl Slot {
    fn node(&self) -> &dyn Node {
        match self {
            Slot::Source(s) => s,
            Slot::Processor(p) => p,
            Slot::Sink(s) => s,
        }
    }

    fn node_mut(&mut self) -> &mut dyn Node {
        match self {
            Slot::Source(s) => s,
            Slot::Processor(p) => p,
            Slot::Sink(s) => s,
        }
    }

    fn as_source(&self) -> Option<&dyn Source> {
        match self {
            Slot::Source(s) => Some(s),
            Slot::Processor(p) => Some(p),
            Slot::Sink(_) => None,
        }
    }

    /// `(input id, source id)` of every connected input.
    fn connections(&self) -> Vec<(NodeId, NodeId)> {
        match self {
            Slot::Source(_) => Vec::new(),
            Slot::Processor(p) => p
                .inputs()
                .iter()
                .filter_map(|i| i.source().map(|s| (i.id(), s)))
                .collect(),
            Slot::Sink(s) => s
                .inputs()
                .iter()
                .filter_map(|i| i.source().map(|src| (i.id(), src)))
                .collect(),
        }
    }

    fn refresh_inputs(&mut self, source: &dyn Source) {
        match self {
            Slot::Source(_) => {}
            Slot::Processor(p) => p.refresh_inputs(source),
            Slot::Sink(s) => s.refresh_inputs(source),
        }
    }
}

/// Owned copy of a source's identity and output, so a source can be wired
/// into a node living in the same arena.
struct SourceSnapshot {
    id: NodeId,
    name: String,
    output: Output,
}

impl Source for SourceSnapshot {
    fn source_id(&self) -> NodeId {
        self.id
    }

    fn source_name(&self) -> &str {
        &self.name
    }

    fn output(&self) -> &Output {
        &self.output
    }
}

/// A graph of sources, processors and sinks, unique by node id.
#[derive(Debug, Clone)]
pub struct ProcessingModel {
    name: String,
    last_saved: Option<DateTime<Utc>>,
    nodes: Slab<Slot>,
    handles: HashMap<NodeId, usize>,
    /// source id -> inputs connected to it
    readers: HashMap<NodeId, BTreeSet<InputRef>>,
}

impl ProcessingModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            last_saved: None,
            nodes: Slab::new(),
            handles: HashMap::new(),
            readers: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn last_saved(&self) -> Option<DateTime<Utc>> {
        self.last_saved
    }

    pub fn mark_saved(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        self.last_saved = Some(now);
        now
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.handles.contains_key(&id)
    }

    fn slot(&self, id: NodeId) -> Option<&Slot> {
        self.handles.get(&id).and_then(|&key| self.nodes.get(key))
    }

    fn slot_mut(&mut self, id: NodeId) -> Option<&mut Slot> {
        let key = *self.handles.get(&id)?;
        self.nodes.get_mut(key)
    }

    pub fn node(&self, id: NodeId) -> Option<&dyn Node> {
        self.slot(id).map(Slot::node)
    }

    pub fn kind_of(&self, id: NodeId) -> Option<NodeKind> {
        self.node(id).map(|n| n.kind())
    }

    /// First node named `name`, if any.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .map(|(_, slot)| slot.node())
            .find(|node| node.name() == name)
            .map(|node| node.id())
    }

    pub fn external_sources(&self) -> impl Iterator<Item = &ExternalSource> {
        self.nodes.iter().filter_map(|(_, slot)| match slot {
            Slot::Source(s) => Some(s),
            _ => None,
        })
    }

    pub fn processors(&self) -> impl Iterator<Item = &Processor> {
        self.nodes.iter().filter_map(|(_, slot)| match slot {
            Slot::Processor(p) => Some(p),
            _ => None,
        })
    }

    pub fn external_sinks(&self) -> impl Iterator<Item = &ExternalSink> {
        self.nodes.iter().filter_map(|(_, slot)| match slot {
            Slot::Sink(s) => Some(s),
            _ => None,
        })
    }

    pub fn external_source(&self, id: NodeId) -> Option<&ExternalSource> {
        match self.slot(id) {
            Some(Slot::Source(s)) => Some(s),
            _ => None,
        }
    }

    pub fn processor(&self, id: NodeId) -> Option<&Processor> {
        match self.slot(id) {
            Some(Slot::Processor(p)) => Some(p),
            _ => None,
        }
    }

    pub fn external_sink(&self, id: NodeId) -> Option<&ExternalSink> {
        match self.slot(id) {
            Some(Slot::Sink(s)) => Some(s),
            _ => None,
        }
    }

    fn insert(&mut self, slot: Slot) -> bool {
        let id = slot.node().id();
        if self.handles.contains_key(&id) {
            return false;
        }
        for (input, source) in slot.connections() {
            self.readers
                .entry(source)
                .or_default()
                .insert(InputRef { owner: id, input });
        }
        let key = self.nodes.insert(slot);
        self.handles.insert(id, key);
        true
    }

    /// Adds `source`. Returns false when a node with the same id is present.
    pub fn add_external_source(&mut self, source: ExternalSource) -> bool {
        self.insert(Slot::Source(source))
    }

    pub fn add_processor(&mut self, processor: Processor) -> bool {
        self.insert(Slot::Processor(processor))
    }

    pub fn add_external_sink(&mut self, sink: ExternalSink) -> bool {
        self.insert(Slot::Sink(sink))
    }

    /// Inputs anywhere in the model reading from `source`.
    pub fn dependents(&self, source: NodeId) -> Vec<InputRef> {
        self.readers
            .get(&source)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    fn disconnect_ref(&mut self, input: InputRef) -> Option<NodeId> {
        let previous = match self.slot_mut(input.owner)? {
            Slot::Processor(p) => p.disconnect_input(input.input).ok().flatten(),
            Slot::Sink(s) => s.disconnect_input(input.input).ok().flatten(),
            Slot::Source(_) => None,
        };
        if let Some(source) = previous {
            self.unindex(source, input);
        }
        previous
    }

    fn unindex(&mut self, source: NodeId, input: InputRef) {
        if let Some(set) = self.readers.get_mut(&source) {
            set.remove(&input);
            if set.is_empty() {
                self.readers.remove(&source);
            }
        }
    }

    fn remove(&mut self, id: NodeId) -> Option<Slot> {
        let key = *self.handles.get(&id)?;
        for input in self.dependents(id) {
            self.disconnect_ref(input);
        }
        self.readers.remove(&id);
        let slot = self.nodes.try_remove(key)?;
        self.handles.remove(&id);
        for (input, source) in slot.connections() {
            self.unindex(source, InputRef { owner: id, input });
        }
        debug!(model = %self.name, node = %slot.node().name(), "removed node");
        Some(slot)
    }

    /// Removes a source and disconnects every input reading from it.
    pub fn remove_external_event_source(&mut self, id: NodeId) -> Option<ExternalSource> {
        if self.external_source(id).is_none() {
            return None;
        }
        match self.remove(id)? {
            Slot::Source(s) => Some(s),
            _ => None,
        }
    }

    pub fn remove_processor(&mut self, id: NodeId) -> Option<Processor> {
        if self.processor(id).is_none() {
            return None;
        }
        match self.remove(id)? {
            Slot::Processor(p) => Some(p),
            _ => None,
        }
    }

    pub fn remove_external_sink(&mut self, id: NodeId) -> Option<ExternalSink> {
        if self.external_sink(id).is_none() {
            return None;
        }
        match self.remove(id)? {
            Slot::Sink(s) => Some(s),
            _ => None,
        }
    }

    fn snapshot(&self, source: NodeId) -> ValidationResult<SourceSnapshot> {
        let source = self
            .slot(source)
            .and_then(Slot::as_source)
            .ok_or(ValidationError::UnknownNode(source))?;
        Ok(SourceSnapshot {
            id: source.source_id(),
            name: source.source_name().to_string(),
            output: source.output().clone(),
        })
    }

    /// Wires `input` of `owner` to the output of `source`.
    pub fn connect(&mut self, owner: NodeId, input: NodeId, source: NodeId) -> ValidationResult<()> {
        let snapshot = self.snapshot(source)?;
        let previous = match self.slot_mut(owner) {
            Some(Slot::Processor(p)) => {
                let previous = p.input(input).and_then(|i| i.source());
                p.connect_input(input, &snapshot)?;
                previous
            }
            Some(Slot::Sink(s)) => {
                let previous = s.input(input).and_then(|i| i.source());
                s.connect_input(input, &snapshot)?;
                previous
            }
            _ => return Err(ValidationError::UnknownNode(owner)),
        };
        let input = InputRef { owner, input };
        if let Some(previous) = previous {
            self.unindex(previous, input);
        }
        self.readers.entry(source).or_default().insert(input);
        Ok(())
    }

    /// Disconnects `input` of `owner`, returning the source it was wired to.
    pub fn disconnect(&mut self, owner: NodeId, input: NodeId) -> ValidationResult<Option<NodeId>> {
        let previous = match self.slot_mut(owner) {
            Some(Slot::Processor(p)) => p.disconnect_input(input)?,
            Some(Slot::Sink(s)) => s.disconnect_input(input)?,
            _ => return Err(ValidationError::UnknownNode(owner)),
        };
        if let Some(source) = previous {
            self.unindex(source, InputRef { owner, input });
        }
        Ok(previous)
    }

    pub fn set_source_attribute(
        &mut self,
        processor: NodeId,
        input: NodeId,
        attribute: &str,
    ) -> ValidationResult<()> {
        match self.slot_mut(processor) {
            Some(Slot::Processor(p)) => p.set_input_attribute(input, attribute),
            _ => Err(ValidationError::UnknownNode(processor)),
        }
    }

    pub fn add_join(&mut self, processor: NodeId, left: NodeId, right: NodeId) -> ValidationResult<()> {
        match self.slot_mut(processor) {
            Some(Slot::Processor(p)) => p.add_join(left, right),
            _ => Err(ValidationError::UnknownNode(processor)),
        }
    }

    pub fn set_parameter(&mut self, node: NodeId, name: &str, value: Value) -> ValidationResult<()> {
        self.slot_mut(node)
            .ok_or(ValidationError::UnknownNode(node))?
            .node_mut()
            .meta_mut()
            .set_parameter(name, value)
    }

    fn refresh_readers(&mut self, source: NodeId) -> ValidationResult<()> {
        let snapshot = self.snapshot(source)?;
        let owners: BTreeSet<NodeId> = self.dependents(source).into_iter().map(|r| r.owner).collect();
        for owner in owners {
            if let Some(slot) = self.slot_mut(owner) {
                slot.refresh_inputs(&snapshot);
            }
        }
        Ok(())
    }

    pub fn add_output_attribute(&mut self, node: NodeId, attribute: Attribute) -> ValidationResult<()> {
        match self.slot_mut(node) {
            Some(Slot::Source(s)) => s.add_output_attribute(attribute)?,
            Some(Slot::Processor(p)) => p.add_output_attribute(attribute)?,
            _ => return Err(ValidationError::UnknownNode(node)),
        }
        self.refresh_readers(node)
    }

    /// Removes an output attribute unless a downstream input has selected it.
    pub fn remove_output_attribute(&mut self, node: NodeId, name: &str) -> ValidationResult<Attribute> {
        let source_name = self
            .snapshot(node)
            .map(|s| s.name)?;
        if self.is_attribute_in_use(node, name) {
            return Err(ValidationError::AttributeInUse {
                source_name,
                attribute: name.to_string(),
            });
        }
        let removed = match self.slot_mut(node) {
            Some(Slot::Source(s)) => s.remove_output_attribute(name),
            Some(Slot::Processor(p)) => p.remove_output_attribute(name),
            _ => None,
        };
        let removed = removed.ok_or_else(|| ValidationError::UnknownAttribute {
            source_name,
            attribute: name.to_string(),
        })?;
        self.refresh_readers(node)?;
        Ok(removed)
    }

    /// Whether any input reading from `source` has selected `attribute`.
    pub fn is_attribute_in_use(&self, source: NodeId, attribute: &str) -> bool {
        self.dependents(source).iter().any(|r| {
            self.processor(r.owner)
                .and_then(|p| p.input(r.input))
                .and_then(|i| i.source_attribute())
                .map_or(false, |a| a.name() == attribute)
        })
    }

    /// Checks that every connection of `id` points at a live source in this
    /// model and that selected attributes still exist on it.
    pub fn validate_wiring(&self, id: NodeId) -> ValidationResult<()> {
        let slot = self.slot(id).ok_or(ValidationError::UnknownNode(id))?;
        for (input, source_id) in slot.connections() {
            let input_name = || {
                let inputs: Vec<(NodeId, String)> = match slot {
                    Slot::Processor(p) => p.inputs().iter().map(|i| (i.id(), i.name().to_string())).collect(),
                    Slot::Sink(s) => s.inputs().iter().map(|i| (i.id(), i.name().to_string())).collect(),
                    Slot::Source(_) => Vec::new(),
                };
                inputs
                    .into_iter()
                    .find(|(i, _)| *i == input)
                    .map(|(_, name)| name)
                    .unwrap_or_default()
            };
            let source = self
                .slot(source_id)
                .and_then(Slot::as_source)
                .ok_or_else(|| ValidationError::DanglingConnection {
                    input: input_name(),
                    source_id,
                })?;
            let selected = match slot {
                Slot::Processor(p) => p.input(input).and_then(|i| i.source_attribute()),
                _ => None,
            };
            if let Some(attribute) = selected {
                let live = source.output().attribute(attribute.name());
                if live.map(Attribute::value_type) != Some(attribute.value_type()) {
                    return Err(ValidationError::UnknownAttribute {
                        source_name: source.source_name().to_string(),
                        attribute: attribute.name().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Validates every node and every connection, stopping at the first failure.
    pub fn validate(&self) -> ValidationResult<()> {
        for (_, slot) in self.nodes.iter() {
            slot.node().validate()?;
            self.validate_wiring(slot.node().id())?;
        }
        Ok(())
    }

    /// Node ids ordered so that every source precedes its readers.
    pub fn topological_order(&self) -> ValidationResult<Vec<NodeId>> {
        let mut graph = DiGraph::<NodeId, ()>::new();
        let mut indices = HashMap::new();
        for (_, slot) in self.nodes.iter() {
            let id = slot.node().id();
            indices.insert(id, graph.add_node(id));
        }
        for (_, slot) in self.nodes.iter() {
            let id = slot.node().id();
            let owner = indices[&id];
            for (_, source) in slot.connections() {
                if source == id {
                    return Err(ValidationError::Cycle {
                        node: slot.node().name().to_string(),
                    });
                }
                if let Some(&from) = indices.get(&source) {
                    graph.add_edge(from, owner, ());
                }
            }
        }
        toposort(&graph, None)
            .map(|order| order.into_iter().map(|idx| graph[idx]).collect())
            .map_err(|cycle| {
                let id = graph[cycle.node_id()];
                ValidationError::Cycle {
                    node: self.node(id).map(|n| n.name().to_string()).unwrap_or_default(),
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiled::{Firing, ProcessorLogic, SinkLogic};
    use crate::context::{ProcessorContext, SinkContext};
    use crate::error::ProcessingError;
    use cep_types::{Event, ValueType};
    use std::sync::Arc;

    struct Noop;

    impl ProcessorLogic for Noop {
        fn process_event(
            &self,
            _ctx: &mut ProcessorContext,
            _firing: &Firing<'_>,
        ) -> Result<Option<Event>, ProcessingError> {
            Ok(None)
        }
    }

    impl SinkLogic for Noop {
        fn process_event(&self, _ctx: &mut SinkContext, _firing: &Firing<'_>) -> Result<(), ProcessingError> {
            Ok(())
        }
    }

    struct Wired {
        model: ProcessingModel,
        source: NodeId,
        processor: NodeId,
        processor_input: NodeId,
        sink: NodeId,
        sink_input: NodeId,
    }

    fn wired() -> Wired {
        let mut model = ProcessingModel::new("test");
        let source = ExternalSource::new("ticks", "Replay")
            .with_attribute(Attribute::new("price", ValueType::Double))
            .with_attribute(Attribute::new("symbol", ValueType::String));
        let processor = Processor::new("scale", "Noop", Arc::new(Noop))
            .with_input("value", ValueType::Double)
            .with_output_attribute(Attribute::new("scaled", ValueType::Double));
        let sink = ExternalSink::new("out", "Noop", Arc::new(Noop))
            .with_input("a", ValueType::Object)
            .with_input("b", ValueType::Object);

        let (source_id, processor_id, sink_id) = (source.id(), processor.id(), sink.id());
        let processor_input = processor.inputs()[0].id();
        let sink_input = sink.inputs()[0].id();
        let sink_other = sink.inputs()[1].id();
        assert!(model.add_external_source(source));
        assert!(model.add_processor(processor));
        assert!(model.add_external_sink(sink));

        model.connect(processor_id, processor_input, source_id).unwrap();
        model
            .set_source_attribute(processor_id, processor_input, "price")
            .unwrap();
        model.connect(sink_id, sink_input, source_id).unwrap();
        model.connect(sink_id, sink_other, processor_id).unwrap();

        Wired {
            model,
            source: source_id,
            processor: processor_id,
            processor_input,
            sink: sink_id,
            sink_input,
        }
    }

    #[test]
    fn test_set_semantics() {
        let mut model = ProcessingModel::new("m");
        let source = ExternalSource::new("s", "Replay");
        assert!(model.add_external_source(source.copy_of()));
        assert!(!model.add_external_source(source.copy_of()));
        assert!(model.add_external_source(source.new_instance()));
        assert_eq!(model.external_sources().count(), 2);
    }

    #[test]
    fn test_wired_model_is_valid() {
        let w = wired();
        assert!(w.model.validate().is_ok());
        assert_eq!(w.model.dependents(w.source).len(), 2);
        let order = w.model.topological_order().unwrap();
        let pos = |id| order.iter().position(|&n| n == id).unwrap();
        assert!(pos(w.source) < pos(w.processor));
        assert!(pos(w.processor) < pos(w.sink));
    }

    #[test]
    fn test_remove_source_cascades() {
        let mut w = wired();
        let removed = w.model.remove_external_event_source(w.source).unwrap();
        assert_eq!(removed.id(), w.source);
        assert!(w.model.dependents(w.source).is_empty());
        for processor in w.model.processors() {
            assert!(processor.inputs().iter().all(|i| !i.is_connected_to(w.source)));
        }
        for sink in w.model.external_sinks() {
            assert!(sink.inputs().iter().all(|i| !i.is_connected_to(w.source)));
        }
        // The processor -> sink wire is untouched.
        assert_eq!(w.model.dependents(w.processor).len(), 1);
        assert!(matches!(
            w.model.validate(),
            Err(ValidationError::NotConnected { .. })
        ));
    }

    #[test]
    fn test_remove_processor_cascades() {
        let mut w = wired();
        let removed = w.model.remove_processor(w.processor).unwrap();
        assert_eq!(removed.id(), w.processor);
        assert_eq!(w.model.len(), 2);
        assert!(w.model.dependents(w.processor).is_empty());
        for sink in w.model.external_sinks() {
            assert!(sink.inputs().iter().all(|i| !i.is_connected_to(w.processor)));
        }
        assert!(!w.model.readers.contains_key(&w.processor));
        assert!(w
            .model
            .readers
            .values()
            .flatten()
            .all(|r| r.owner != w.processor));
        // The source keeps its sink reader.
        assert_eq!(
            w.model.dependents(w.source),
            vec![InputRef {
                owner: w.sink,
                input: w.sink_input
            }]
        );
    }

    #[test]
    fn test_remove_wrong_kind_is_noop() {
        let mut w = wired();
        assert!(w.model.remove_processor(w.source).is_none());
        assert!(w.model.remove_external_sink(w.processor).is_none());
        assert_eq!(w.model.len(), 3);
        assert!(w.model.remove_external_sink(w.sink).is_some());
        assert_eq!(w.model.dependents(w.processor).len(), 0);
        assert_eq!(w.model.dependents(w.source).len(), 1);
    }

    #[test]
    fn test_reconnect_moves_index_entry() {
        let mut w = wired();
        w.model.connect(w.sink, w.sink_input, w.processor).unwrap();
        assert_eq!(w.model.dependents(w.source).len(), 1);
        assert_eq!(w.model.dependents(w.processor).len(), 2);
        assert_eq!(w.model.disconnect(w.sink, w.sink_input), Ok(Some(w.processor)));
        assert_eq!(w.model.dependents(w.processor).len(), 1);
    }

    #[test]
    fn test_attribute_in_use_protected() {
        let mut w = wired();
        assert!(w.model.is_attribute_in_use(w.source, "price"));
        assert!(matches!(
            w.model.remove_output_attribute(w.source, "price"),
            Err(ValidationError::AttributeInUse { .. })
        ));
        let removed = w.model.remove_output_attribute(w.source, "symbol").unwrap();
        assert_eq!(removed.name(), "symbol");
        assert!(matches!(
            w.model.remove_output_attribute(w.source, "symbol"),
            Err(ValidationError::UnknownAttribute { .. })
        ));
    }

    #[test]
    fn test_added_attribute_visible_downstream() {
        let mut w = wired();
        w.model
            .add_output_attribute(w.source, Attribute::new("volume", ValueType::Long))
            .unwrap();
        w.model
            .set_source_attribute(w.processor, w.processor_input, "volume")
            .unwrap();
        assert!(w.model.validate().is_ok());
    }

    #[test]
    fn test_cycle_detected() {
        let mut w = wired();
        let second = Processor::new("echo", "Noop", Arc::new(Noop)).with_input("value", ValueType::Double);
        let (second_id, second_input) = (second.id(), second.inputs()[0].id());
        w.model.add_processor(second);
        w.model.connect(second_id, second_input, w.processor).unwrap();
        assert!(w.model.topological_order().is_ok());

        w.model.connect(w.processor, w.processor_input, second_id).unwrap();
        assert!(matches!(
            w.model.topological_order(),
            Err(ValidationError::Cycle { .. })
        ));
    }

    #[test]
    fn test_self_loop_detected() {
        let mut w = wired();
        w.model.connect(w.processor, w.processor_input, w.processor).unwrap();
        assert_eq!(
            w.model.topological_order(),
            Err(ValidationError::Cycle {
                node: "scale".to_string()
            })
        );
    }

    #[test]
    fn test_connect_rejects_unknown_nodes() {
        let mut w = wired();
        assert_eq!(
            w.model.connect(w.processor, w.processor_input, w.sink),
            Err(ValidationError::UnknownNode(w.sink))
        );
        let stranger = NodeId::new();
        assert_eq!(
            w.model.connect(stranger, w.processor_input, w.source),
            Err(ValidationError::UnknownNode(stranger))
        );
    }

    #[test]
    fn test_dangling_connection_detected() {
        let mut model = ProcessingModel::new("m");
        let outside = ExternalSource::new("outside", "Replay")
            .with_attribute(Attribute::new("x", ValueType::Double));
        let mut sink = ExternalSink::new("out", "Noop", Arc::new(Noop)).with_input("in", ValueType::Object);
        let input = sink.inputs()[0].id();
        sink.connect_input(input, &outside).unwrap();
        model.add_external_sink(sink);
        assert!(matches!(
            model.validate(),
            Err(ValidationError::DanglingConnection { .. })
        ));
    }

    #[test]
    fn test_set_parameter_unknown() {
        let mut w = wired();
        assert!(matches!(
            w.model.set_parameter(w.processor, "Nope", Value::Int(1)),
            Err(ValidationError::UnknownParameter { .. })
        ));
        let stranger = NodeId::new();
        assert_eq!(
            w.model.set_parameter(stranger, "x", Value::Int(1)),
            Err(ValidationError::UnknownNode(stranger))
        );
    }
}
