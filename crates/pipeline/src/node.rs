//! Node identity and the metadata shared by every graph participant.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use cep_types::Value;

use crate::error::{ValidationError, ValidationResult};
use crate::parameter::Parameters;

/// Generated identity of a node. Immutable for the life of the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl NodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for NodeId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// The role a node plays in a processing model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Source,
    Processor,
    Sink,
    Input,
    Output,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Source => "source",
            NodeKind::Processor => "processor",
            NodeKind::Sink => "sink",
            NodeKind::Input => "input",
            NodeKind::Output => "output",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity, naming and parameters common to all nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeMeta {
    id: NodeId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author_email: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    parameters: Parameters,
}

impl NodeMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(),
            name: name.into(),
            description: String::new(),
            author_email: None,
            location: None,
            icon: None,
            parameters: Parameters::default(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut Parameters {
        &mut self.parameters
    }

    /// Sets the parameter called `name` (display or normalized form).
    pub fn set_parameter(&mut self, name: &str, value: Value) -> ValidationResult<()> {
        let node = self.name.clone();
        match self.parameters.by_name_mut(name) {
            Some(parameter) => parameter.set_value(&node, value),
            None => Err(ValidationError::UnknownParameter {
                node,
                parameter: name.to_string(),
            }),
        }
    }

    /// Fail-fast validation of every parameter.
    pub fn validate(&self) -> ValidationResult<()> {
        self.parameters.validate(&self.name)
    }

    /// Same content under a freshly generated id.
    pub fn reissue(&self) -> Self {
        Self {
            id: NodeId::new(),
            ..self.clone()
        }
    }
}

/// Behaviour shared by every graph participant.
///
/// `copy_of` and `new_instance` are distinct on purpose: a copy keeps the
/// node's identity, a new instance is a separate entity built from the same
/// template. Equality and hashing of nodes use the id alone.
pub trait Node {
    fn meta(&self) -> &NodeMeta;

    fn meta_mut(&mut self) -> &mut NodeMeta;

    fn kind(&self) -> NodeKind;

    fn validate(&self) -> ValidationResult<()>;

    /// Duplicate with a fresh id. Owned inputs and outputs get fresh ids
    /// too and wiring is not carried over.
    fn new_instance(&self) -> Self
    where
        Self: Sized;

    /// Exact duplicate, same id.
    fn copy_of(&self) -> Self
    where
        Self: Sized + Clone,
    {
        self.clone()
    }

    fn id(&self) -> NodeId {
        self.meta().id()
    }

    fn name(&self) -> &str {
        &self.meta().name
    }

    fn parameters(&self) -> &Parameters {
        self.meta().parameters()
    }
}
