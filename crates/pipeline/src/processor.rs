//! Processors: nodes that consume events on their inputs and emit events on
//! their output.

use cep_types::{Attribute, TypeError, ValueType};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::compiled::{CompiledInput, CompiledProcessor, ProcessorLogic};
use crate::error::{MemoryError, ValidationError, ValidationResult};
use crate::io::{Output, ProcessorInput, ProcessorJoin, Source};
use crate::memory::{MemoryProvider, ProcessorMemory};
use crate::node::{Node, NodeId, NodeKind, NodeMeta};
use crate::parameter::Parameter;
use crate::statement::event_name;

/// How a processor sizes its private window memory.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MemoryRequirement {
    #[default]
    None,
    Fixed(usize),
    /// Capacity read from the named integer parameter at compile time.
    Parameter(String),
}

#[derive(Clone)]
pub struct Processor {
    meta: NodeMeta,
    class_name: String,
    inputs: Vec<ProcessorInput>,
    joins: Vec<ProcessorJoin>,
    output: Output,
    memory: MemoryRequirement,
    logic: Arc<dyn ProcessorLogic>,
}

impl Processor {
    pub fn new(
        name: impl Into<String>,
        class_name: impl Into<String>,
        logic: Arc<dyn ProcessorLogic>,
    ) -> Self {
        Self {
            meta: NodeMeta::new(name),
            class_name: class_name.into(),
            inputs: Vec::new(),
            joins: Vec::new(),
            output: Output::new("output"),
            memory: MemoryRequirement::None,
            logic,
        }
    }

    pub fn with_input(mut self, name: impl Into<String>, value_type: ValueType) -> Self {
        self.inputs.push(ProcessorInput::new(name, value_type));
        self
    }

    pub fn with_output_attribute(mut self, attribute: Attribute) -> Self {
        let _ = self.output.add_attribute(attribute);
        self
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.meta.parameters_mut().insert(parameter);
        self
    }

    pub fn with_memory(mut self, memory: MemoryRequirement) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.meta.description = description.into();
        self
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn inputs(&self) -> &[ProcessorInput] {
        &self.inputs
    }

    pub fn input(&self, id: NodeId) -> Option<&ProcessorInput> {
        self.inputs.iter().find(|input| input.id() == id)
    }

    pub fn input_by_name(&self, name: &str) -> Option<&ProcessorInput> {
        self.inputs.iter().find(|input| input.name() == name)
    }

    pub fn joins(&self) -> &[ProcessorJoin] {
        &self.joins
    }

    pub fn memory_requirement(&self) -> &MemoryRequirement {
        &self.memory
    }

    fn input_mut(&mut self, id: NodeId) -> ValidationResult<&mut ProcessorInput> {
        let node = self.meta.name.clone();
        self.inputs
            .iter_mut()
            .find(|input| input.id() == id)
            .ok_or(ValidationError::UnknownInput { node, input: id })
    }

    pub(crate) fn connect_input(&mut self, input: NodeId, source: &dyn Source) -> ValidationResult<()> {
        self.input_mut(input)?.connect_source(source);
        Ok(())
    }

    pub(crate) fn disconnect_input(&mut self, input: NodeId) -> ValidationResult<Option<NodeId>> {
        Ok(self.input_mut(input)?.disconnect().map(|c| c.source()))
    }

    pub(crate) fn set_input_attribute(&mut self, input: NodeId, attribute: &str) -> ValidationResult<()> {
        self.input_mut(input)?.set_source_attribute(attribute)
    }

    pub(crate) fn refresh_inputs(&mut self, source: &dyn Source) {
        for input in &mut self.inputs {
            input.refresh_schema(source);
        }
    }

    pub(crate) fn add_output_attribute(&mut self, attribute: Attribute) -> Result<(), TypeError> {
        self.output.add_attribute(attribute)
    }

    pub(crate) fn remove_output_attribute(&mut self, name: &str) -> Option<Attribute> {
        self.output.remove_attribute(name)
    }

    /// Declares an equality join between two distinct inputs of this processor.
    pub fn add_join(&mut self, left: NodeId, right: NodeId) -> ValidationResult<()> {
        let join = ProcessorJoin::new(left, right);
        self.check_join(&join)?;
        if !self.joins.contains(&join) {
            self.joins.push(join);
        }
        Ok(())
    }

    pub fn remove_join(&mut self, left: NodeId, right: NodeId) -> bool {
        let before = self.joins.len();
        self.joins.retain(|j| *j != ProcessorJoin::new(left, right));
        self.joins.len() != before
    }

    fn check_join(&self, join: &ProcessorJoin) -> ValidationResult<()> {
        let invalid = |message: String| ValidationError::InvalidJoin {
            processor: self.meta.name.clone(),
            message,
        };
        if join.left == join.right {
            return Err(invalid("an input cannot be joined with itself".to_string()));
        }
        for side in [join.left, join.right] {
            if self.input(side).is_none() {
                return Err(invalid(format!("input {} does not belong to this processor", side)));
            }
        }
        Ok(())
    }

    /// Joined inputs must select attributes of comparable types.
    fn validate_join(&self, join: &ProcessorJoin) -> ValidationResult<()> {
        self.check_join(join)?;
        let selected = |id: NodeId| {
            self.input(id)
                .and_then(ProcessorInput::source_attribute)
                .map(Attribute::value_type)
        };
        if let (Some(left), Some(right)) = (selected(join.left), selected(join.right)) {
            if !left.is_assignable_to(right) && !right.is_assignable_to(left) {
                return Err(ValidationError::InvalidJoin {
                    processor: self.meta.name.clone(),
                    message: format!("cannot compare {} with {}", left, right),
                });
            }
        }
        Ok(())
    }

    /// Resolved window capacity, `None` when the processor keeps no memory.
    pub fn memory_size(&self) -> Result<Option<i64>, MemoryError> {
        match &self.memory {
            MemoryRequirement::None => Ok(None),
            MemoryRequirement::Fixed(size) => Ok(Some(*size as i64)),
            MemoryRequirement::Parameter(name) => self
                .meta
                .parameters()
                .long(name)
                .map(Some)
                .ok_or_else(|| MemoryError::UnresolvedSize(name.clone())),
        }
    }

    pub fn create_memory_for_processor(
        &self,
        provider: &dyn MemoryProvider,
    ) -> Result<Option<ProcessorMemory>, MemoryError> {
        let Some(size) = self.memory_size()? else {
            return Ok(None);
        };
        if size <= 0 {
            return Err(MemoryError::InvalidSize(size));
        }
        debug!(processor = %self.meta.name, size, "creating processor memory");
        provider.create_circular_buffer(size as usize).map(Some)
    }

    pub fn compile(&self) -> ValidationResult<CompiledProcessor> {
        self.validate()?;
        let inputs = self
            .inputs
            .iter()
            .map(|input| CompiledInput {
                id: input.id(),
                name: input.name().to_string(),
                // Both are present once validation passed.
                source: input.source().unwrap_or_default(),
                source_attribute: input.source_attribute().map(|a| a.name().to_string()),
            })
            .collect();
        Ok(CompiledProcessor {
            id: self.id(),
            name: self.meta.name.clone(),
            event_name: event_name(self.id()),
            inputs,
            joins: self.joins.clone(),
            output: self.output.event_type().clone(),
            parameters: self.meta.parameters().clone(),
            logic: Arc::clone(&self.logic),
        })
    }
}

impl Node for Processor {
    fn meta(&self) -> &NodeMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut NodeMeta {
        &mut self.meta
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Processor
    }

    fn validate(&self) -> ValidationResult<()> {
        self.meta.validate()?;
        if self.inputs.is_empty() {
            return Err(ValidationError::NoInputs {
                node: self.meta.name.clone(),
            });
        }
        for input in &self.inputs {
            input.validate()?;
        }
        for join in &self.joins {
            self.validate_join(join)?;
        }
        self.output.validate()
    }

    fn new_instance(&self) -> Self {
        let inputs: Vec<ProcessorInput> = self.inputs.iter().map(Node::new_instance).collect();
        let remap = |old: NodeId| {
            self.inputs
                .iter()
                .position(|input| input.id() == old)
                .map(|index| inputs[index].id())
        };
        let joins = self
            .joins
            .iter()
            .filter_map(|join| Some(ProcessorJoin::new(remap(join.left)?, remap(join.right)?)))
            .collect();
        Self {
            meta: self.meta.reissue(),
            class_name: self.class_name.clone(),
            inputs,
            joins,
            output: self.output.new_instance(),
            memory: self.memory.clone(),
            logic: Arc::clone(&self.logic),
        }
    }
}

impl Source for Processor {
    fn source_id(&self) -> NodeId {
        self.id()
    }

    fn source_name(&self) -> &str {
        self.name()
    }

    fn output(&self) -> &Output {
        &self.output
    }
}

impl fmt::Debug for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Processor")
            .field("meta", &self.meta)
            .field("class_name", &self.class_name)
            .field("inputs", &self.inputs)
            .field("joins", &self.joins)
            .field("output", &self.output)
            .field("memory", &self.memory)
            .finish_non_exhaustive()
    }
}

crate::node_identity!(Processor);
