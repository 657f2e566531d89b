//! Connection points: inputs, outputs and the joins between inputs.

use cep_types::{Attribute, EventType, TypeError, ValueType};
use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};
use crate::node::{Node, NodeId, NodeKind, NodeMeta};

/// Anything with an output that inputs can connect to.
pub trait Source {
    fn source_id(&self) -> NodeId;

    fn source_name(&self) -> &str;

    fn output(&self) -> &Output;
}

/// The source an input is wired to, with the schema it had when wired.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    source: NodeId,
    source_name: String,
    schema: EventType,
}

impl Connection {
    fn to(source: &dyn Source) -> Self {
        Self {
            source: source.source_id(),
            source_name: source.source_name().to_string(),
            schema: source.output().event_type().clone(),
        }
    }

    pub fn source(&self) -> NodeId {
        self.source
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn schema(&self) -> &EventType {
        &self.schema
    }
}

/// A typed connection point holding at most one source.
#[derive(Debug, Clone)]
pub struct Input {
    meta: NodeMeta,
    value_type: ValueType,
    connection: Option<Connection>,
}

impl Input {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            meta: NodeMeta::new(name),
            value_type,
            connection: None,
        }
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Wires this input to `source`, replacing any previous connection.
    pub fn connect_source(&mut self, source: &dyn Source) {
        self.connection = Some(Connection::to(source));
    }

    pub fn disconnect(&mut self) -> Option<Connection> {
        self.connection.take()
    }

    pub fn connection(&self) -> Option<&Connection> {
        self.connection.as_ref()
    }

    pub fn source(&self) -> Option<NodeId> {
        self.connection.as_ref().map(Connection::source)
    }

    pub fn is_connected_to(&self, source: NodeId) -> bool {
        self.source() == Some(source)
    }

    /// Re-reads the schema of the connected source after its output changed.
    pub(crate) fn refresh_schema(&mut self, source: &dyn Source) {
        if self.is_connected_to(source.source_id()) {
            self.connection = Some(Connection::to(source));
        }
    }
}

impl Node for Input {
    fn meta(&self) -> &NodeMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut NodeMeta {
        &mut self.meta
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Input
    }

    fn validate(&self) -> ValidationResult<()> {
        self.meta.validate()?;
        if self.connection.is_none() {
            return Err(ValidationError::NotConnected {
                input: self.meta.name.clone(),
            });
        }
        Ok(())
    }

    fn new_instance(&self) -> Self {
        Self {
            meta: self.meta.reissue(),
            value_type: self.value_type,
            connection: None,
        }
    }
}

/// An input of a processor, which also selects one attribute of its source.
#[derive(Debug, Clone)]
pub struct ProcessorInput {
    input: Input,
    source_attribute: Option<Attribute>,
}

impl ProcessorInput {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            input: Input::new(name, value_type),
            source_attribute: None,
        }
    }

    pub fn input(&self) -> &Input {
        &self.input
    }

    pub fn value_type(&self) -> ValueType {
        self.input.value_type()
    }

    /// Wires this input to `source`. The selected attribute is cleared, it
    /// has to be chosen again against the new source.
    pub fn connect_source(&mut self, source: &dyn Source) {
        self.input.connect_source(source);
        self.source_attribute = None;
    }

    pub fn disconnect(&mut self) -> Option<Connection> {
        self.source_attribute = None;
        self.input.disconnect()
    }

    pub fn source(&self) -> Option<NodeId> {
        self.input.source()
    }

    pub fn is_connected_to(&self, source: NodeId) -> bool {
        self.input.is_connected_to(source)
    }

    pub fn source_attribute(&self) -> Option<&Attribute> {
        self.source_attribute.as_ref()
    }

    /// Selects the attribute named `name` of the connected source.
    pub fn set_source_attribute(&mut self, name: &str) -> ValidationResult<()> {
        let attribute = self.resolve(name)?;
        self.source_attribute = Some(attribute);
        Ok(())
    }

    /// Selects `attribute`, which must exist on the connected source.
    pub fn select_attribute(&mut self, attribute: &Attribute) -> ValidationResult<()> {
        self.set_source_attribute(attribute.name())
    }

    fn resolve(&self, name: &str) -> ValidationResult<Attribute> {
        let connection = self
            .input
            .connection()
            .ok_or_else(|| ValidationError::NotConnected {
                input: self.input.meta.name.clone(),
            })?;
        let attribute = connection
            .schema()
            .attribute(name)
            .ok_or_else(|| ValidationError::UnknownAttribute {
                source_name: connection.source_name().to_string(),
                attribute: name.to_string(),
            })?;
        if !attribute.is_compatible_with(self.value_type()) {
            return Err(ValidationError::IncompatibleAttribute {
                input: self.input.meta.name.clone(),
                attribute: attribute.name().to_string(),
                expected: self.value_type(),
                found: attribute.value_type(),
            });
        }
        Ok(attribute.clone())
    }

    pub(crate) fn refresh_schema(&mut self, source: &dyn Source) {
        self.input.refresh_schema(source);
    }
}

impl Node for ProcessorInput {
    fn meta(&self) -> &NodeMeta {
        self.input.meta()
    }

    fn meta_mut(&mut self) -> &mut NodeMeta {
        self.input.meta_mut()
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Input
    }

    fn validate(&self) -> ValidationResult<()> {
        self.input.validate()?;
        let attribute = self
            .source_attribute
            .as_ref()
            .ok_or_else(|| ValidationError::MissingSourceAttribute {
                input: self.input.meta.name.clone(),
            })?;
        // The source may have changed since the attribute was chosen.
        self.resolve(attribute.name()).map(|_| ())
    }

    fn new_instance(&self) -> Self {
        Self {
            input: self.input.new_instance(),
            source_attribute: None,
        }
    }
}

/// The single output of a source or processor.
#[derive(Debug, Clone)]
pub struct Output {
    meta: NodeMeta,
    event_type: EventType,
}

impl Output {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            meta: NodeMeta::new(name),
            event_type: EventType::new(),
        }
    }

    pub fn event_type(&self) -> &EventType {
        &self.event_type
    }

    pub fn add_attribute(&mut self, attribute: Attribute) -> Result<(), TypeError> {
        self.event_type.add_attribute(attribute)
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<Attribute> {
        self.event_type.remove_attribute(name)
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.event_type.attribute(name)
    }
}

impl Node for Output {
    fn meta(&self) -> &NodeMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut NodeMeta {
        &mut self.meta
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Output
    }

    fn validate(&self) -> ValidationResult<()> {
        self.meta.validate()
    }

    fn new_instance(&self) -> Self {
        Self {
            meta: self.meta.reissue(),
            event_type: self.event_type.clone(),
        }
    }
}

/// Pairwise equality join between two processor inputs on their selected
/// source attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessorJoin {
    pub left: NodeId,
    pub right: NodeId,
}

impl ProcessorJoin {
    pub fn new(left: NodeId, right: NodeId) -> Self {
        Self { left, right }
    }
}

crate::node_identity!(Input, ProcessorInput, Output);

#[cfg(test)]
mod tests {
    use super::*;

    struct Ticker {
        id: NodeId,
        output: Output,
    }

    impl Source for Ticker {
        fn source_id(&self) -> NodeId {
            self.id
        }

        fn source_name(&self) -> &str {
            "ticker"
        }

        fn output(&self) -> &Output {
            &self.output
        }
    }

    fn ticker() -> Ticker {
        let mut output = Output::new("out");
        output
            .add_attribute(Attribute::new("price", ValueType::Float))
            .unwrap();
        output
            .add_attribute(Attribute::new("symbol", ValueType::String))
            .unwrap();
        Ticker {
            id: NodeId::new(),
            output,
        }
    }

    #[test]
    fn test_plain_input_requires_source() {
        let mut input = Input::new("in", ValueType::Double);
        assert!(matches!(
            input.validate(),
            Err(ValidationError::NotConnected { .. })
        ));
        let source = ticker();
        input.connect_source(&source);
        assert!(input.is_connected_to(source.id));
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_attribute_before_connect_fails() {
        let mut input = ProcessorInput::new("value", ValueType::Double);
        assert!(matches!(
            input.set_source_attribute("price"),
            Err(ValidationError::NotConnected { .. })
        ));
    }

    #[test]
    fn test_attribute_selection() {
        let source = ticker();
        let mut input = ProcessorInput::new("value", ValueType::Double);
        input.connect_source(&source);

        assert!(matches!(
            input.set_source_attribute("volume"),
            Err(ValidationError::UnknownAttribute { .. })
        ));
        assert!(matches!(
            input.set_source_attribute("symbol"),
            Err(ValidationError::IncompatibleAttribute { .. })
        ));
        assert!(matches!(
            input.validate(),
            Err(ValidationError::MissingSourceAttribute { .. })
        ));

        input.set_source_attribute("price").unwrap();
        assert_eq!(input.source_attribute().map(Attribute::name), Some("price"));
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_reconnect_clears_attribute() {
        let first = ticker();
        let second = ticker();
        let mut input = ProcessorInput::new("value", ValueType::Double);
        input.connect_source(&first);
        input.set_source_attribute("price").unwrap();

        input.connect_source(&second);
        assert!(input.is_connected_to(second.id));
        assert!(!input.is_connected_to(first.id));
        assert!(input.source_attribute().is_none());
    }

    #[test]
    fn test_copy_and_new_instance_ids() {
        let source = ticker();
        let mut input = ProcessorInput::new("value", ValueType::Double);
        input.connect_source(&source);

        let copy = input.copy_of();
        assert_eq!(copy.id(), input.id());
        assert_eq!(copy, input);
        assert!(copy.is_connected_to(source.id));

        let fresh = input.new_instance();
        assert_ne!(fresh.id(), input.id());
        assert_ne!(fresh, input);
        assert_eq!(fresh.name(), "value");
        assert!(fresh.source().is_none());
    }
}
