//! Processing model builder and compiler for complex event processing.
//!
//! A [`ProcessingModel`] is a graph of external event sources, processors and
//! external sinks. A [`Compiler`] turns a validated model into windowed
//! statements on a query engine and wires each statement's results back into
//! the compiled node, yielding a [`ProcessingRuntime`] that events are pushed
//! into per source.

pub mod error;
pub mod node;
#[macro_use]
pub mod macros;
pub mod parameter;
pub mod io;
pub mod memory;
pub mod context;
pub mod compiled;
pub mod source;
pub mod processor;
pub mod sink;
pub mod statement;
pub mod engine;
pub mod adaptor;
pub mod compiler;
pub mod runtime;
pub mod graph;
pub mod config;
pub mod registry;
pub mod export;
pub mod compare;
pub mod stages;


// Re-export commonly used types
pub use compare::tolerance;
pub use compiled::*;
pub use compiler::*;
pub use config::*;
pub use context::*;
pub use error::*;
pub use export::*;
pub use graph::*;
pub use io::*;
pub use memory::*;
pub use node::*;
pub use parameter::*;
pub use processor::*;
pub use registry::*;
pub use runtime::*;
pub use sink::*;
pub use source::*;
pub use cep_types;
