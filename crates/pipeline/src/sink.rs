//! External sinks: consumers at the edge of the model.

use cep_types::ValueType;
use std::fmt;
use std::sync::Arc;

use crate::compiled::{CompiledExternalSink, CompiledInput, SinkLogic};
use crate::error::{ValidationError, ValidationResult};
use crate::io::{Input, Source};
use crate::node::{Node, NodeId, NodeKind, NodeMeta};
use crate::parameter::Parameter;

#[derive(Clone)]
pub struct ExternalSink {
    meta: NodeMeta,
    class_name: String,
    inputs: Vec<Input>,
    logic: Arc<dyn SinkLogic>,
}

impl ExternalSink {
    pub fn new(
        name: impl Into<String>,
        class_name: impl Into<String>,
        logic: Arc<dyn SinkLogic>,
    ) -> Self {
        Self {
            meta: NodeMeta::new(name),
            class_name: class_name.into(),
            inputs: Vec::new(),
            logic,
        }
    }

    pub fn with_input(mut self, name: impl Into<String>, value_type: ValueType) -> Self {
        self.inputs.push(Input::new(name, value_type));
        self
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.meta.parameters_mut().insert(parameter);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.meta.description = description.into();
        self
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    pub fn input(&self, id: NodeId) -> Option<&Input> {
        self.inputs.iter().find(|input| input.id() == id)
    }

    pub fn input_by_name(&self, name: &str) -> Option<&Input> {
        self.inputs.iter().find(|input| input.name() == name)
    }

    fn input_mut(&mut self, id: NodeId) -> ValidationResult<&mut Input> {
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

    pub(crate) fn refresh_inputs(&mut self, source: &dyn Source) {
        for input in &mut self.inputs {
            input.refresh_schema(source);
        }
    }

    pub fn compile(&self) -> ValidationResult<CompiledExternalSink> {
        self.validate()?;
        let inputs = self
            .inputs
            .iter()
            .map(|input| CompiledInput {
                id: input.id(),
                name: input.name().to_string(),
                source: input.source().unwrap_or_default(),
                source_attribute: None,
            })
            .collect();
        Ok(CompiledExternalSink {
            id: self.id(),
            name: self.meta.name.clone(),
            inputs,
            parameters: self.meta.parameters().clone(),
            logic: Arc::clone(&self.logic),
        })
    }
}

impl Node for ExternalSink {
    fn meta(&self) -> &NodeMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut NodeMeta {
        &mut self.meta
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Sink
    }

    fn validate(&self) -> ValidationResult<()> {
        self.meta.validate()?;
        if self.inputs.is_empty() {
            return Err(ValidationError::NoInputs {
                node: self.meta.name.clone(),
            });
        }
        self.inputs.iter().try_for_each(Node::validate)
    }

    fn new_instance(&self) -> Self {
        Self {
            meta: self.meta.reissue(),
            class_name: self.class_name.clone(),
            inputs: self.inputs.iter().map(Node::new_instance).collect(),
            logic: Arc::clone(&self.logic),
        }
    }
}

impl fmt::Debug for ExternalSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalSink")
            .field("meta", &self.meta)
            .field("class_name", &self.class_name)
            .field("inputs", &self.inputs)
            .finish_non_exhaustive()
    }
}

crate::node_identity!(ExternalSink);
