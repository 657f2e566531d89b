//! Error types for the model compiler

use cep_types::{TypeError, ValueType};
use thiserror::Error;

use crate::engine::StatementId;
use crate::node::NodeId;

/// Recoverable problems with a model, reported back to whoever built it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Node '{node}': required parameter '{parameter}' is not set")]
    MissingParameter { node: String, parameter: String },

    #[error("Node '{node}': parameter '{parameter}' {message}")]
    InvalidParameter {
        node: String,
        parameter: String,
        message: String,
    },

    #[error("Node '{node}' has no parameter '{parameter}'")]
    UnknownParameter { node: String, parameter: String },

    #[error("Input '{input}' is not connected to a source")]
    NotConnected { input: String },

    #[error("Input '{input}' has no source attribute selected")]
    MissingSourceAttribute { input: String },

    #[error("Source '{source_name}' has no attribute named '{attribute}'")]
    UnknownAttribute {
        source_name: String,
        attribute: String,
    },

    #[error("Attribute '{attribute}' ({found}) is not compatible with input '{input}' ({expected})")]
    IncompatibleAttribute {
        input: String,
        attribute: String,
        expected: ValueType,
        found: ValueType,
    },

    #[error("Attribute '{attribute}' of '{source_name}' is selected by a downstream input")]
    AttributeInUse {
        source_name: String,
        attribute: String,
    },

    #[error("Node '{node}' has no input {input}")]
    UnknownInput { node: String, input: NodeId },

    #[error("Node '{node}' declares no inputs")]
    NoInputs { node: String },

    #[error("Processor '{processor}': invalid join: {message}")]
    InvalidJoin { processor: String, message: String },

    #[error("Processing model '{model}' has no external event sources")]
    NoSources { model: String },

    #[error("Node {0} is not part of this model")]
    UnknownNode(NodeId),

    #[error("Input '{input}' is connected to {source_id}, which is not part of this model")]
    DanglingConnection { input: String, source_id: NodeId },

    #[error("Processing graph contains a cycle through '{node}'")]
    Cycle { node: String },

    #[error(transparent)]
    Type(#[from] TypeError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MemoryError {
    #[error("Memory size must be positive, got {0}")]
    InvalidSize(i64),

    #[error("Operation '{0}' is not supported by this memory")]
    UnsupportedOperation(&'static str),

    #[error("Memory size parameter '{0}' is not set or not an integer")]
    UnresolvedSize(String),
}

/// Errors raised by a query engine binding.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    #[error("Invalid statement '{statement}': {message}")]
    InvalidStatement { statement: String, message: String },

    #[error("Unknown statement {0:?}")]
    UnknownStatement(StatementId),

    #[error("Engine is not running")]
    NotRunning,

    #[error("Failed to spawn engine dispatcher: {0}")]
    Spawn(String),

    #[error("Unknown engine kind: {0}")]
    UnknownEngine(String),
}

/// Error raised by a compiled node while handling one firing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessingError {
    #[error("No event was delivered on input '{input}'")]
    MissingInput { input: String },

    #[error("Value '{attribute}' on input '{input}' is missing or not numeric")]
    BadValue { input: String, attribute: String },

    #[error("Processor '{node}' has no memory allocated")]
    NoMemory { node: String },

    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error("Processing error: {0}")]
    Other(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Every per-node failure of one compile pass, one message per line.
    #[error("{}", .0.join("\n"))]
    Failed(Vec<String>),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("Source {0} is not registered with this runtime")]
    UnknownSource(NodeId),

    #[error("Runtime has not been started")]
    NotStarted,

    #[error("Runtime has been shut down")]
    Shutdown,

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Errors building a model from a [`ModelConfig`](crate::config::ModelConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Duplicate node name: {0}")]
    DuplicateName(String),

    #[error("Node '{node}' references unknown node '{reference}'")]
    UnknownReference { node: String, reference: String },

    #[error("Processor type not registered: {0}")]
    UnknownProcessorType(String),

    #[error("Sink type not registered: {0}")]
    UnknownSinkType(String),

    #[error("Unknown compiler kind: {0}")]
    UnknownCompiler(String),

    #[error("Processor '{node}' has {declared} inputs, configuration wires {configured}")]
    InputCountMismatch {
        node: String,
        declared: usize,
        configured: usize,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type ValidationResult<T> = Result<T, ValidationError>;
