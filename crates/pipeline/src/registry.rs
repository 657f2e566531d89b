//! Template registry for creating processor and sink instances by class name.

use std::collections::BTreeMap;
use tracing::debug;

use crate::error::ConfigError;
use crate::node::Node;
use crate::processor::Processor;
use crate::sink::ExternalSink;
use crate::stages::register_builtin_stages;

/// Processor and sink templates keyed by class name.
///
/// Lookups never hand out the template itself: every created node is a
/// [`new_instance`](Node::new_instance) with its own id.
#[derive(Debug, Default, Clone)]
pub struct NodeRegistry {
    processors: BTreeMap<String, Processor>,
    sinks: BTreeMap<String, ExternalSink>,
}

impl NodeRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in stages.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        register_builtin_stages(&mut registry);
        registry
    }

    /// Registers a processor template under its class name, replacing any
    /// earlier template of that class.
    pub fn register_processor(&mut self, template: Processor) {
        debug!(class = template.class_name(), "registering processor template");
        self.processors.insert(template.class_name().to_string(), template);
    }

    pub fn register_sink(&mut self, template: ExternalSink) {
        debug!(class = template.class_name(), "registering sink template");
        self.sinks.insert(template.class_name().to_string(), template);
    }

    pub fn processor_template(&self, class_name: &str) -> Option<&Processor> {
        self.processors.get(class_name)
    }

    pub fn sink_template(&self, class_name: &str) -> Option<&ExternalSink> {
        self.sinks.get(class_name)
    }

    /// New processor of class `class_name` named `name`.
    pub fn create_processor(&self, class_name: &str, name: &str) -> Result<Processor, ConfigError> {
        let mut processor = self
            .processors
            .get(class_name)
            .ok_or_else(|| ConfigError::UnknownProcessorType(class_name.to_string()))?
            .new_instance();
        processor.meta_mut().name = name.to_string();
        Ok(processor)
    }

    pub fn create_sink(&self, class_name: &str, name: &str) -> Result<ExternalSink, ConfigError> {
        let mut sink = self
            .sinks
            .get(class_name)
            .ok_or_else(|| ConfigError::UnknownSinkType(class_name.to_string()))?
            .new_instance();
        sink.meta_mut().name = name.to_string();
        Ok(sink)
    }

    pub fn processor_classes(&self) -> impl Iterator<Item = &str> {
        self.processors.keys().map(String::as_str)
    }

    pub fn sink_classes(&self) -> impl Iterator<Item = &str> {
        self.sinks.keys().map(String::as_str)
    }
}
