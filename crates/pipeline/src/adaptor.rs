//! Statement listeners that feed engine results into compiled nodes.

use cep_types::Event;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError, Weak};
use tracing::{trace, warn};

use crate::compiled::{CompiledExternalSink, CompiledInput, CompiledProcessor};
use crate::context::{ProcessorContext, SinkContext};
use crate::engine::{QueryEngine, ResultRow, StatementListener};
use crate::node::NodeId;
use crate::statement::{alias, properties_column};

/// Per-input events of one row, keyed by input id.
fn gather(
    inputs: &[CompiledInput],
    row: &ResultRow,
    column: impl Fn(usize) -> String,
) -> HashMap<NodeId, Event> {
    inputs
        .iter()
        .enumerate()
        .filter_map(|(i, input)| row.get(&column(i)).map(|event| (input.id, event.clone())))
        .collect()
}

/// Runs a compiled processor on every row of its statement and forwards the
/// emitted events under the processor's event name.
pub struct ProcessorAdaptor {
    processor: CompiledProcessor,
    context: Mutex<ProcessorContext>,
    engine: Weak<dyn QueryEngine>,
}

impl ProcessorAdaptor {
    pub fn new(processor: CompiledProcessor, context: ProcessorContext, engine: Weak<dyn QueryEngine>) -> Self {
        Self {
            processor,
            context: Mutex::new(context),
            engine,
        }
    }

    pub fn processor(&self) -> &CompiledProcessor {
        &self.processor
    }

    fn fire(&self, row: &ResultRow) {
        let events = gather(&self.processor.inputs, row, properties_column);
        let (output, err) = {
            let mut ctx = self.context.lock().unwrap_or_else(PoisonError::into_inner);
            (self.processor.process_event(&mut ctx, &events), ctx.err.clone())
        };
        match output {
            Ok(Some(event)) => {
                trace!(processor = %self.processor.name, %event, "forwarding");
                let Some(engine) = self.engine.upgrade() else {
                    return;
                };
                if let Err(e) = engine.send_event(event, &self.processor.event_name) {
                    warn!(processor = %self.processor.name, "Failed to forward event: {}", e);
                    err.println(format_args!("Processor '{}': {}", self.processor.name, e));
                }
            }
            Ok(None) => {}
            Err(e) => {
                warn!(processor = %self.processor.name, "Processing failed: {}", e);
                err.println(format_args!("Processor '{}': {}", self.processor.name, e));
            }
        }
    }
}

impl StatementListener for ProcessorAdaptor {
    fn update(&self, rows: &[ResultRow]) {
        for row in rows {
            self.fire(row);
        }
    }
}

/// Hands every row of a sink statement to the compiled sink.
pub struct SinkAdaptor {
    sink: CompiledExternalSink,
    context: Mutex<SinkContext>,
}

impl SinkAdaptor {
    pub fn new(sink: CompiledExternalSink, context: SinkContext) -> Self {
        Self {
            sink,
            context: Mutex::new(context),
        }
    }

    pub fn sink(&self) -> &CompiledExternalSink {
        &self.sink
    }
}

impl StatementListener for SinkAdaptor {
    fn update(&self, rows: &[ResultRow]) {
        let mut ctx = self.context.lock().unwrap_or_else(PoisonError::into_inner);
        for row in rows {
            let events = gather(&self.sink.inputs, row, alias);
            if let Err(e) = self.sink.process_event(&mut ctx, &events) {
                warn!(sink = %self.sink.name, "Sink failed: {}", e);
                ctx.err
                    .println(format_args!("Sink '{}': {}", self.sink.name, e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiled::{Firing, ProcessorLogic};
    use crate::context::{CapturedOutput, OutputStream};
    use crate::error::ProcessingError;
    use crate::parameter::Parameters;
    use cep_types::EventType;
    use std::sync::Arc;

    struct Double;

    impl ProcessorLogic for Double {
        fn process_event(
            &self,
            _ctx: &mut ProcessorContext,
            firing: &Firing<'_>,
        ) -> Result<Option<Event>, ProcessingError> {
            let v = firing.double_at(0)?;
            Ok(Some(Event::new().with("v", v * 2.0)))
        }
    }

    fn adaptor(err: OutputStream) -> ProcessorAdaptor {
        let processor = CompiledProcessor {
            id: NodeId::new(),
            name: "double".to_string(),
            event_name: "_double".to_string(),
            inputs: vec![CompiledInput {
                id: NodeId::new(),
                name: "in".to_string(),
                source: NodeId::new(),
                source_attribute: Some("v".to_string()),
            }],
            joins: vec![],
            output: EventType::new(),
            parameters: Parameters::new(),
            logic: Arc::new(Double),
        };
        let ctx = ProcessorContext::new("double", OutputStream::sink(), err, None);
        ProcessorAdaptor::new(processor, ctx, Weak::<crate::engine::EmbeddedEngine>::new())
    }

    #[test]
    fn test_processing_error_goes_to_error_stream() {
        let captured = CapturedOutput::new();
        let adaptor = adaptor(captured.stream());
        let row = ResultRow::new().with("_0_properties", Event::new().with("v", "text"));
        adaptor.update(&[row]);
        let lines = captured.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("Processor 'double':"), "{}", lines[0]);
    }

    #[test]
    fn test_gather_keys_by_input_id() {
        let adaptor = adaptor(OutputStream::sink());
        let event = Event::new().with("v", 1.5);
        let row = ResultRow::new().with("_0_properties", event.clone());
        let events = gather(&adaptor.processor().inputs, &row, properties_column);
        assert_eq!(events.get(&adaptor.processor().inputs[0].id), Some(&event));
    }
}
