//! Difference between the values of two inputs.

use cep_types::{Attribute, Event, ValueType};
use std::sync::Arc;

use crate::compiled::{Firing, ProcessorLogic};
use crate::context::ProcessorContext;
use crate::error::ProcessingError;
use crate::processor::Processor;

pub const DIFFERENCE: &str = "Difference";

/// Emits `left - right` whenever both inputs hold a value.
#[derive(Debug, Default, Clone, Copy)]
pub struct Difference;

impl Difference {
    pub fn template() -> Processor {
        Processor::new("Difference", DIFFERENCE, Arc::new(Difference))
            .with_description("Subtracts the right value from the left value")
            .with_input("left", ValueType::Double)
            .with_input("right", ValueType::Double)
            .with_output_attribute(Attribute::new("difference", ValueType::Double))
    }
}

impl ProcessorLogic for Difference {
    fn process_event(
        &self,
        _ctx: &mut ProcessorContext,
        firing: &Firing<'_>,
    ) -> Result<Option<Event>, ProcessingError> {
        let difference = firing.double_at(0)? - firing.double_at(1)?;
        Ok(Some(Event::new().with("difference", difference)))
    }
}
