//! Sink forwarding events into a flume channel, for embedding a model in a
//! larger program.

use cep_types::{Event, ValueType};
use std::sync::Arc;

use crate::compiled::{Firing, SinkLogic};
use crate::context::SinkContext;
use crate::error::ProcessingError;
use crate::sink::ExternalSink;

pub const CHANNEL_SINK: &str = "ChannelSink";

pub struct ChannelSink {
    sender: flume::Sender<Event>,
}

impl ChannelSink {
    /// A sink named `name` with one input, sending the event of every firing
    /// to `sender`.
    pub fn sink(name: impl Into<String>, sender: flume::Sender<Event>) -> ExternalSink {
        ExternalSink::new(name, CHANNEL_SINK, Arc::new(ChannelSink { sender }))
            .with_description("Forwards received events to a channel")
            .with_input("event", ValueType::Object)
    }
}

impl SinkLogic for ChannelSink {
    fn process_event(&self, _ctx: &mut SinkContext, firing: &Firing<'_>) -> Result<(), ProcessingError> {
        self.sender
            .send(firing.merged())
            .map_err(|_| ProcessingError::Other("channel receiver dropped".to_string()))
    }
}
