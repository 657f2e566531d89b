//! Boundary between compiled models and the continuous-query engine that
//! runs them.
//!
//! The compiler only talks to [`QueryEngine`]: it registers schemas through
//! an [`EngineConfiguration`], creates statements, and attaches
//! [`StatementListener`]s. Results come back as [`ResultRow`]s, one column
//! per selected stream.

mod embedded;
mod parse;

pub use embedded::EmbeddedEngine;

use cep_types::{Event, EventDefinition};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::EngineError;

/// Schema registry handed to an engine when it is created.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineConfiguration {
    event_types: BTreeMap<String, EventDefinition>,
}

impl EngineConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `definition` under `name`, replacing any earlier definition.
    pub fn add_event_type(&mut self, name: impl Into<String>, definition: EventDefinition) {
        self.event_types.insert(name.into(), definition);
    }

    pub fn event_type(&self, name: &str) -> Option<&EventDefinition> {
        self.event_types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.event_types.contains_key(name)
    }

    pub fn event_types(&self) -> impl Iterator<Item = (&String, &EventDefinition)> {
        self.event_types.iter()
    }

    pub fn len(&self) -> usize {
        self.event_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.event_types.is_empty()
    }
}

/// Handle of a statement registered with an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatementId(pub(crate) usize);

impl fmt::Display for StatementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stmt-{}", self.0)
    }
}

/// One row of a statement result: selected column name to event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultRow {
    columns: BTreeMap<String, Event>,
}

impl ResultRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, event: Event) -> Self {
        self.insert(column, event);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, event: Event) {
        self.columns.insert(column.into(), event);
    }

    pub fn get(&self, column: &str) -> Option<&Event> {
        self.columns.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&String, &Event)> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Receives the new rows of a statement each time it fires.
pub trait StatementListener: Send + Sync {
    fn update(&self, rows: &[ResultRow]);
}

/// A running continuous-query engine.
///
/// Engines call listeners of one statement one at a time. Listeners may
/// call [`send_event`](QueryEngine::send_event) on the engine that invoked
/// them.
pub trait QueryEngine: Send + Sync {
    fn uri(&self) -> &str;

    fn configuration(&self) -> &EngineConfiguration;

    fn create_statement(&self, text: &str) -> Result<StatementId, EngineError>;

    fn add_listener(
        &self,
        statement: StatementId,
        listener: Arc<dyn StatementListener>,
    ) -> Result<(), EngineError>;

    /// Queues `event` on the stream registered as `event_name`.
    fn send_event(&self, event: Event, event_name: &str) -> Result<(), EngineError>;

    fn start(&self) -> Result<(), EngineError>;

    /// Stops the engine. Idempotent.
    fn destroy(&self);

    fn is_destroyed(&self) -> bool;
}

/// Engine bindings known to this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    #[default]
    Embedded,
}

impl EngineKind {
    pub fn create(
        self,
        uri: &str,
        configuration: EngineConfiguration,
    ) -> Result<Arc<dyn QueryEngine>, EngineError> {
        match self {
            EngineKind::Embedded => Ok(Arc::new(EmbeddedEngine::new(uri, configuration))),
        }
    }
}

impl FromStr for EngineKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "embedded" => Ok(EngineKind::Embedded),
            other => Err(EngineError::UnknownEngine(other.to_string())),
        }
    }
}
