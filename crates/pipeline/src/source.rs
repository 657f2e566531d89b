//! External event sources.

use cep_types::{Attribute, TypeError};

use crate::compiled::CompiledExternalSource;
use crate::error::ValidationResult;
use crate::io::{Output, Source};
use crate::node::{Node, NodeId, NodeKind, NodeMeta};
use crate::statement::event_name;

/// A node fed from outside the model, e.g. a message queue or a replayed file.
#[derive(Debug, Clone)]
pub struct ExternalSource {
    meta: NodeMeta,
    class_name: String,
    output: Output,
}

impl ExternalSource {
    pub fn new(name: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            meta: NodeMeta::new(name),
            class_name: class_name.into(),
            output: Output::new("output"),
        }
    }

    /// Builder form of [`add_output_attribute`](Self::add_output_attribute)
    /// for templates; duplicates are ignored.
    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        let _ = self.output.add_attribute(attribute);
        self
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub(crate) fn add_output_attribute(&mut self, attribute: Attribute) -> Result<(), TypeError> {
        self.output.add_attribute(attribute)
    }

    pub(crate) fn remove_output_attribute(&mut self, name: &str) -> Option<Attribute> {
        self.output.remove_attribute(name)
    }

    pub fn compile(&self) -> ValidationResult<CompiledExternalSource> {
        self.validate()?;
        Ok(CompiledExternalSource {
            id: self.id(),
            name: self.meta.name.clone(),
            event_name: event_name(self.id()),
            event_type: self.output.event_type().clone(),
        })
    }
}

impl Node for ExternalSource {
    fn meta(&self) -> &NodeMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut NodeMeta {
        &mut self.meta
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Source
    }

    fn validate(&self) -> ValidationResult<()> {
        self.meta.validate()?;
        self.output.validate()
    }

    fn new_instance(&self) -> Self {
        Self {
            meta: self.meta.reissue(),
            class_name: self.class_name.clone(),
            output: self.output.new_instance(),
        }
    }
}

impl Source for ExternalSource {
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

crate::node_identity!(ExternalSource);
