//! Immutable, runtime-facing snapshots of validated nodes.

use cep_types::{Event, EventType, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::context::{ProcessorContext, SinkContext};
use crate::error::ProcessingError;
use crate::io::ProcessorJoin;
use crate::node::NodeId;
use crate::parameter::Parameters;

/// Processing logic of a processor class.
///
/// Implementations are stateless: anything that must survive between
/// firings lives in the context's memory.
pub trait ProcessorLogic: Send + Sync {
    /// Handles one firing. `Ok(Some(event))` emits `event` downstream.
    fn process_event(
        &self,
        ctx: &mut ProcessorContext,
        firing: &Firing<'_>,
    ) -> Result<Option<Event>, ProcessingError>;
}

/// Consuming logic of a sink class.
pub trait SinkLogic: Send + Sync {
    fn process_event(&self, ctx: &mut SinkContext, firing: &Firing<'_>)
        -> Result<(), ProcessingError>;
}

/// One input as bound at compile time.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledInput {
    pub id: NodeId,
    pub name: String,
    pub source: NodeId,
    /// Selected attribute of the source event. Sink inputs select none.
    pub source_attribute: Option<String>,
}

/// The events of one firing, addressed by input.
pub struct Firing<'a> {
    inputs: &'a [CompiledInput],
    events: &'a HashMap<NodeId, Event>,
    parameters: &'a Parameters,
}

impl<'a> Firing<'a> {
    pub fn new(
        inputs: &'a [CompiledInput],
        events: &'a HashMap<NodeId, Event>,
        parameters: &'a Parameters,
    ) -> Self {
        Self {
            inputs,
            events,
            parameters,
        }
    }

    pub fn inputs(&self) -> &[CompiledInput] {
        self.inputs
    }

    pub fn parameters(&self) -> &Parameters {
        self.parameters
    }

    pub fn event(&self, input: NodeId) -> Option<&Event> {
        self.events.get(&input)
    }

    /// Event delivered on the input at `index` (input-list order).
    pub fn event_at(&self, index: usize) -> Result<&Event, ProcessingError> {
        let input = self.input_at(index)?;
        self.events
            .get(&input.id)
            .ok_or_else(|| ProcessingError::MissingInput {
                input: input.name.clone(),
            })
    }

    /// Value of the selected source attribute on the input at `index`.
    pub fn value_at(&self, index: usize) -> Result<&Value, ProcessingError> {
        let input = self.input_at(index)?;
        let attribute = input.source_attribute.as_deref().unwrap_or_default();
        self.event_at(index)?
            .get(attribute)
            .ok_or_else(|| ProcessingError::BadValue {
                input: input.name.clone(),
                attribute: attribute.to_string(),
            })
    }

    pub fn double_at(&self, index: usize) -> Result<f64, ProcessingError> {
        let input = self.input_at(index)?;
        self.value_at(index)?
            .as_f64()
            .ok_or_else(|| ProcessingError::BadValue {
                input: input.name.clone(),
                attribute: input.source_attribute.clone().unwrap_or_default(),
            })
    }

    /// Union of every delivered event, later inputs winning on conflicts.
    pub fn merged(&self) -> Event {
        self.inputs
            .iter()
            .filter_map(|input| self.events.get(&input.id))
            .fold(Event::new(), |acc, event| acc.union(event))
    }

    fn input_at(&self, index: usize) -> Result<&CompiledInput, ProcessingError> {
        self.inputs
            .get(index)
            .ok_or_else(|| ProcessingError::MissingInput {
                input: format!("#{}", index),
            })
    }
}

#[derive(Debug, Clone)]
pub struct CompiledExternalSource {
    pub id: NodeId,
    pub name: String,
    pub event_name: String,
    pub event_type: EventType,
}

pub struct CompiledProcessor {
    pub id: NodeId,
    pub name: String,
    pub event_name: String,
    pub inputs: Vec<CompiledInput>,
    pub joins: Vec<ProcessorJoin>,
    pub output: EventType,
    pub parameters: Parameters,
    pub(crate) logic: Arc<dyn ProcessorLogic>,
}

impl CompiledProcessor {
    /// Runs one firing. `events` maps input id to the event delivered on that input.
    pub fn process_event(
        &self,
        ctx: &mut ProcessorContext,
        events: &HashMap<NodeId, Event>,
    ) -> Result<Option<Event>, ProcessingError> {
        let firing = Firing::new(&self.inputs, events, &self.parameters);
        self.logic.process_event(ctx, &firing)
    }
}

impl fmt::Debug for CompiledProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledProcessor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("event_name", &self.event_name)
            .field("inputs", &self.inputs)
            .field("joins", &self.joins)
            .finish_non_exhaustive()
    }
}

pub struct CompiledExternalSink {
    pub id: NodeId,
    pub name: String,
    pub inputs: Vec<CompiledInput>,
    pub parameters: Parameters,
    pub(crate) logic: Arc<dyn SinkLogic>,
}

impl CompiledExternalSink {
    pub fn process_event(
        &self,
        ctx: &mut SinkContext,
        events: &HashMap<NodeId, Event>,
    ) -> Result<(), ProcessingError> {
        let firing = Firing::new(&self.inputs, events, &self.parameters);
        self.logic.process_event(ctx, &firing)
    }
}

impl fmt::Debug for CompiledExternalSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledExternalSink")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .finish_non_exhaustive()
    }
}
