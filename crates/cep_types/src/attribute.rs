//! Attributes and event schemas.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::TypeError;
use crate::value::ValueType;

/// Name to type mapping registered with a query engine for one event stream.
pub type EventDefinition = BTreeMap<String, ValueType>;

/// A named, typed field of an event schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attribute {
    name: String,
    #[serde(rename = "type")]
    value_type: ValueType,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// True if values of this attribute may flow into something declared as `target`.
    pub fn is_compatible_with(&self, target: ValueType) -> bool {
        self.value_type.is_assignable_to(target)
    }
}

/// An ordered schema of attributes. Names are unique within one event type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventType {
    attributes: Vec<Attribute>,
}

impl EventType {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style attribute addition for schemas known to be well formed.
    /// A duplicate name replaces nothing and is silently skipped.
    pub fn with_attribute(mut self, name: impl Into<String>, value_type: ValueType) -> Self {
        let _ = self.add_attribute(Attribute::new(name, value_type));
        self
    }

    pub fn add_attribute(&mut self, attribute: Attribute) -> Result<(), TypeError> {
        if self.attribute(attribute.name()).is_some() {
            return Err(TypeError::DuplicateAttribute(attribute.name().to_string()));
        }
        self.attributes.push(attribute);
        Ok(())
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<Attribute> {
        let index = self.attributes.iter().position(|a| a.name() == name)?;
        Some(self.attributes.remove(index))
    }

    /// Linear lookup by exact name; the first match wins.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name() == name)
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn event_definition(&self) -> EventDefinition {
        let mut definition = EventDefinition::new();
        for attribute in &self.attributes {
            definition
                .entry(attribute.name().to_string())
                .or_insert(attribute.value_type());
        }
        definition
    }
}
