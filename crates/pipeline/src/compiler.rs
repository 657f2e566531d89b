//! Turns a validated [`ProcessingModel`] into a running query engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::adaptor::{ProcessorAdaptor, SinkAdaptor};
use crate::compiled::CompiledExternalSource;
use crate::context::{OutputStream, ProcessorContext, SinkContext};
use crate::engine::{EngineConfiguration, EngineKind, QueryEngine};
use crate::error::{CompileError, ConfigError, ValidationError};
use crate::graph::ProcessingModel;
use crate::io::Source;
use crate::memory::{HeapMemoryProvider, MemoryProvider};
use crate::node::Node;
use crate::processor::Processor;
use crate::runtime::ProcessingRuntime;
use crate::sink::ExternalSink;
use crate::statement::{event_name, processor_statement, sink_statement};

pub trait Compiler {
    fn compile(&self, model: &ProcessingModel) -> Result<ProcessingRuntime, CompileError>;

    fn set_memory_provider(&mut self, provider: Arc<dyn MemoryProvider>);

    fn set_standard_out(&mut self, out: OutputStream);

    fn set_standard_error(&mut self, err: OutputStream);
}

/// Compiler implementations selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompilerKind {
    #[default]
    Embedded,
}

impl CompilerKind {
    pub fn create(self) -> Box<dyn Compiler> {
        match self {
            CompilerKind::Embedded => Box::new(StatementCompiler::new(EngineKind::Embedded)),
        }
    }
}

impl FromStr for CompilerKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "embedded" => Ok(CompilerKind::Embedded),
            other => Err(ConfigError::UnknownCompiler(other.to_string())),
        }
    }
}

impl fmt::Display for CompilerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompilerKind::Embedded => f.write_str("embedded"),
        }
    }
}

/// Compiles every processor and sink into one windowed statement and wires
/// the statement results back into the compiled node through an adaptor.
pub struct StatementCompiler {
    engine: EngineKind,
    memory_provider: Arc<dyn MemoryProvider>,
    out: OutputStream,
    err: OutputStream,
}

impl StatementCompiler {
    pub fn new(engine: EngineKind) -> Self {
        Self {
            engine,
            memory_provider: Arc::new(HeapMemoryProvider),
            out: OutputStream::stdout(),
            err: OutputStream::stderr(),
        }
    }

    fn configuration(model: &ProcessingModel) -> EngineConfiguration {
        let mut configuration = EngineConfiguration::new();
        for source in model.external_sources() {
            configuration.add_event_type(event_name(source.id()), source.output().event_type().event_definition());
        }
        for processor in model.processors() {
            configuration.add_event_type(
                event_name(processor.id()),
                processor.output().event_type().event_definition(),
            );
        }
        configuration
    }

    fn compile_processor(
        &self,
        model: &ProcessingModel,
        engine: &Arc<dyn QueryEngine>,
        processor: &Processor,
    ) -> Result<(), String> {
        model.validate_wiring(processor.id()).map_err(|e| e.to_string())?;
        let compiled = processor.compile().map_err(|e| e.to_string())?;
        let memory = processor
            .create_memory_for_processor(self.memory_provider.as_ref())
            .map_err(|e| e.to_string())?;
        let statement = processor_statement(&compiled).map_err(|e| e.to_string())?;
        let id = engine.create_statement(&statement).map_err(|e| e.to_string())?;
        debug!(processor = %compiled.name, %id, %statement, "registered processor statement");

        let context = ProcessorContext::new(&compiled.name, self.out.clone(), self.err.clone(), memory);
        let adaptor = ProcessorAdaptor::new(compiled, context, Arc::downgrade(engine));
        engine
            .add_listener(id, Arc::new(adaptor))
            .map_err(|e| e.to_string())
    }

    fn compile_sink(
        &self,
        model: &ProcessingModel,
        engine: &Arc<dyn QueryEngine>,
        sink: &ExternalSink,
    ) -> Result<(), String> {
        model.validate_wiring(sink.id()).map_err(|e| e.to_string())?;
        let compiled = sink.compile().map_err(|e| e.to_string())?;
        let statement = sink_statement(&compiled).map_err(|e| e.to_string())?;
        let id = engine.create_statement(&statement).map_err(|e| e.to_string())?;
        debug!(sink = %compiled.name, %id, %statement, "registered sink statement");

        let context = SinkContext::new(&compiled.name, self.out.clone(), self.err.clone());
        engine
            .add_listener(id, Arc::new(SinkAdaptor::new(compiled, context)))
            .map_err(|e| e.to_string())
    }
}

impl Default for StatementCompiler {
    fn default() -> Self {
        Self::new(EngineKind::default())
    }
}

impl Compiler for StatementCompiler {
    fn compile(&self, model: &ProcessingModel) -> Result<ProcessingRuntime, CompileError> {
        info!(model = %model.name(), nodes = model.len(), "compiling processing model");
        if model.external_sources().next().is_none() {
            return Err(ValidationError::NoSources {
                model: model.name().to_string(),
            }
            .into());
        }
        model.topological_order()?;

        let configuration = Self::configuration(model);
        debug!(event_types = configuration.len(), "registered event types");
        let engine = self.engine.create(model.name(), configuration)?;

        let mut errors = Vec::new();
        let mut sources: Vec<CompiledExternalSource> = Vec::new();
        for source in model.external_sources() {
            match source.compile() {
                Ok(compiled) => sources.push(compiled),
                Err(e) => errors.push(format!("Source '{}': {}", source.name(), e)),
            }
        }
        for processor in model.processors() {
            if let Err(e) = self.compile_processor(model, &engine, processor) {
                errors.push(format!("Processor '{}': {}", processor.name(), e));
            }
        }
        for sink in model.external_sinks() {
            if let Err(e) = self.compile_sink(model, &engine, sink) {
                errors.push(format!("Sink '{}': {}", sink.name(), e));
            }
        }

        if !errors.is_empty() {
            engine.destroy();
            error!(model = %model.name(), errors = errors.len(), "compilation failed");
            return Err(CompileError::Failed(errors));
        }

        info!(model = %model.name(), "compilation finished");
        Ok(ProcessingRuntime::new(
            model.name(),
            engine,
            sources,
            self.out.clone(),
            self.err.clone(),
        ))
    }

    fn set_memory_provider(&mut self, provider: Arc<dyn MemoryProvider>) {
        self.memory_provider = provider;
    }

    fn set_standard_out(&mut self, out: OutputStream) {
        self.out = out;
    }

    fn set_standard_error(&mut self, err: OutputStream) {
        self.err = err;
    }
}
