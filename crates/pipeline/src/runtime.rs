//! The running instantiation of a compiled model.

use cep_types::Event;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::compiled::CompiledExternalSource;
use crate::context::OutputStream;
use crate::engine::QueryEngine;
use crate::error::RuntimeError;
use crate::node::NodeId;

/// Live handle on a compiled model.
///
/// Events are injected per source with [`send_event_from_source`] or
/// through a [`SourceEmitter`] handed to a connector's own run loop.
/// Dropping the runtime shuts it down.
///
/// [`send_event_from_source`]: ProcessingRuntime::send_event_from_source
pub struct ProcessingRuntime {
    name: String,
    engine: Arc<dyn QueryEngine>,
    sources: HashMap<NodeId, CompiledExternalSource>,
    started: Arc<AtomicBool>,
    out: OutputStream,
    err: OutputStream,
}

impl ProcessingRuntime {
    pub(crate) fn new(
        name: impl Into<String>,
        engine: Arc<dyn QueryEngine>,
        sources: Vec<CompiledExternalSource>,
        out: OutputStream,
        err: OutputStream,
    ) -> Self {
        Self {
            name: name.into(),
            engine,
            sources: sources.into_iter().map(|s| (s.id, s)).collect(),
            started: Arc::new(AtomicBool::new(false)),
            out,
            err,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Starts accepting events. Calling it again is a no-op.
    pub fn start(&self) -> Result<(), RuntimeError> {
        if self.engine.is_destroyed() {
            return Err(RuntimeError::Shutdown);
        }
        if self.started.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.engine.start()?;
        self.started.store(true, Ordering::SeqCst);
        info!(model = %self.name, sources = self.sources.len(), "processing runtime started");
        Ok(())
    }

    /// Stops the engine after draining queued events. Idempotent.
    pub fn shutdown(&self) {
        if self.engine.is_destroyed() {
            return;
        }
        self.engine.destroy();
        info!(model = %self.name, "processing runtime shut down");
    }

    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::SeqCst) && !self.engine.is_destroyed()
    }

    /// Injects `event` as if emitted by the source `source`.
    pub fn send_event_from_source(&self, event: Event, source: NodeId) -> Result<(), RuntimeError> {
        let source = self
            .sources
            .get(&source)
            .ok_or(RuntimeError::UnknownSource(source))?;
        send(&*self.engine, &self.started, source, event)
    }

    /// A cloneable handle that injects events for one source.
    pub fn emitter(&self, source: NodeId) -> Result<SourceEmitter, RuntimeError> {
        let compiled = self
            .sources
            .get(&source)
            .ok_or(RuntimeError::UnknownSource(source))?;
        Ok(SourceEmitter {
            engine: Arc::clone(&self.engine),
            started: Arc::clone(&self.started),
            source: Arc::new(compiled.clone()),
        })
    }

    pub fn source(&self, id: NodeId) -> Option<&CompiledExternalSource> {
        self.sources.get(&id)
    }

    pub fn source_by_name(&self, name: &str) -> Option<&CompiledExternalSource> {
        self.sources.values().find(|s| s.name == name)
    }

    pub fn sources(&self) -> impl Iterator<Item = &CompiledExternalSource> {
        self.sources.values()
    }

    pub fn standard_out(&self) -> &OutputStream {
        &self.out
    }

    pub fn standard_error(&self) -> &OutputStream {
        &self.err
    }
}

impl std::fmt::Debug for ProcessingRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessingRuntime")
            .field("name", &self.name)
            .field("engine", &self.engine.uri())
            .field("sources", &self.sources.len())
            .field("running", &self.is_running())
            .finish()
    }
}

impl Drop for ProcessingRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn send(
    engine: &dyn QueryEngine,
    started: &AtomicBool,
    source: &CompiledExternalSource,
    event: Event,
) -> Result<(), RuntimeError> {
    if engine.is_destroyed() {
        return Err(RuntimeError::Shutdown);
    }
    if !started.load(Ordering::SeqCst) {
        return Err(RuntimeError::NotStarted);
    }
    debug!(source = %source.name, %event, "injecting event");
    engine.send_event(event, &source.event_name)?;
    Ok(())
}

/// Injects events for a single source of a running model.
#[derive(Clone)]
pub struct SourceEmitter {
    engine: Arc<dyn QueryEngine>,
    started: Arc<AtomicBool>,
    source: Arc<CompiledExternalSource>,
}

impl SourceEmitter {
    pub fn source(&self) -> &CompiledExternalSource {
        &self.source
    }

    pub fn emit(&self, event: Event) -> Result<(), RuntimeError> {
        send(&*self.engine, &self.started, &self.source, event)
    }
}

impl std::fmt::Debug for SourceEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceEmitter")
            .field("source", &self.source.name)
            .finish()
    }
}
