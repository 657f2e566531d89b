//! Writes every received event to the standard output stream.

use cep_types::{Event, ValueType};
use std::sync::Arc;
use tracing::debug;

use crate::compiled::{Firing, SinkLogic};
use crate::context::SinkContext;
use crate::error::ProcessingError;
use crate::parameter::Parameter;
use crate::sink::ExternalSink;

pub const LOG_SINK: &str = "LogSink";

#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl LogSink {
    pub fn template() -> ExternalSink {
        ExternalSink::new("Log", LOG_SINK, Arc::new(LogSink))
            .with_description("Prints received events")
            .with_input("event", ValueType::Object)
            .with_parameter(Parameter::new(1, "Prefix", ValueType::String).with_default(""))
    }
}

impl SinkLogic for LogSink {
    fn process_event(&self, ctx: &mut SinkContext, firing: &Firing<'_>) -> Result<(), ProcessingError> {
        let event: Event = firing.merged();
        let prefix = firing
            .parameters()
            .value("Prefix")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        debug!(sink = ctx.node(), %event, "log sink");
        ctx.out.println(format_args!("{}{}", prefix, event));
        Ok(())
    }
}
