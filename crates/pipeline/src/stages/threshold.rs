//! Passes through values above a configured threshold.

use cep_types::{Attribute, Event, ValueType};
use std::sync::Arc;

use crate::compiled::{Firing, ProcessorLogic};
use crate::context::ProcessorContext;
use crate::error::ProcessingError;
use crate::parameter::Parameter;
use crate::processor::Processor;

pub const THRESHOLD: &str = "Threshold";

#[derive(Debug, Default, Clone, Copy)]
pub struct Threshold;

impl Threshold {
    pub fn template() -> Processor {
        Processor::new("Threshold", THRESHOLD, Arc::new(Threshold))
            .with_description("Emits values strictly greater than the threshold")
            .with_input("value", ValueType::Double)
            .with_output_attribute(Attribute::new("value", ValueType::Double))
            .with_parameter(Parameter::new(1, "Threshold", ValueType::Double).required().with_default(0.0))
    }
}

impl ProcessorLogic for Threshold {
    fn process_event(
        &self,
        _ctx: &mut ProcessorContext,
        firing: &Firing<'_>,
    ) -> Result<Option<Event>, ProcessingError> {
        let limit = firing
            .parameters()
            .double("Threshold")
            .ok_or_else(|| ProcessingError::Other("threshold is not set".to_string()))?;
        let value = firing.double_at(0)?;
        Ok((value > limit).then(|| Event::new().with("value", value)))
    }
}
