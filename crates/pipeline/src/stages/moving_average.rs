//! Simple moving average over a window of recent values.

use cep_types::{Attribute, Event, Value, ValueType};
use std::sync::Arc;

use crate::compiled::{Firing, ProcessorLogic};
use crate::context::ProcessorContext;
use crate::error::ProcessingError;
use crate::parameter::Parameter;
use crate::processor::{MemoryRequirement, Processor};

pub const MOVING_AVERAGE: &str = "MovingAverage";
pub const WINDOW_SIZE: &str = "Window Size";

/// Averages the last `Window Size` values seen on its single input and
/// emits the result as `average` on every firing.
#[derive(Debug, Default, Clone, Copy)]
pub struct MovingAverage;

impl MovingAverage {
    pub fn template() -> Processor {
        Processor::new("Moving Average", MOVING_AVERAGE, Arc::new(MovingAverage))
            .with_description("Simple moving average over the most recent values")
            .with_input("value", ValueType::Double)
            .with_output_attribute(Attribute::new("average", ValueType::Double))
            .with_parameter(
                Parameter::new(1, WINDOW_SIZE, ValueType::Int)
                    .required()
                    .with_description("Number of values averaged")
                    .with_range(1.0, 100_000.0)
                    .with_default(3),
            )
            .with_memory(MemoryRequirement::Parameter(WINDOW_SIZE.to_string()))
    }
}

impl ProcessorLogic for MovingAverage {
    fn process_event(
        &self,
        ctx: &mut ProcessorContext,
        firing: &Firing<'_>,
    ) -> Result<Option<Event>, ProcessingError> {
        let value = firing.double_at(0)?;
        let memory = ctx.memory()?;
        memory.add(Value::Double(value));
        let window = memory.values();
        let sum: f64 = window.iter().filter_map(Value::as_f64).sum();
        let average = sum / window.len() as f64;
        Ok(Some(Event::new().with("average", average)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiled::CompiledInput;
    use crate::context::OutputStream;
    use crate::memory::{HeapMemoryProvider, MemoryProvider};
    use crate::node::NodeId;
    use crate::parameter::Parameters;
    use std::collections::HashMap;

    #[test]
    fn test_window_of_three() {
        let input = CompiledInput {
            id: NodeId::new(),
            name: "value".to_string(),
            source: NodeId::new(),
            source_attribute: Some("x".to_string()),
        };
        let memory = HeapMemoryProvider.create_circular_buffer(3).unwrap();
        let mut ctx = ProcessorContext::new("sma", OutputStream::sink(), OutputStream::sink(), Some(memory));
        let params = Parameters::new();
        let inputs = vec![input];

        let mut averages = Vec::new();
        for x in [1.0, 2.0, 3.0, 4.0] {
            let events = HashMap::from([(inputs[0].id, Event::new().with("x", x))]);
            let out = MovingAverage
                .process_event(&mut ctx, &Firing::new(&inputs, &events, &params))
                .unwrap()
                .unwrap();
            averages.push(out.get_double("average").unwrap());
        }
        assert_eq!(averages, vec![1.0, 1.5, 2.0, 3.0]);
    }

    #[test]
    fn test_requires_memory() {
        let inputs = vec![CompiledInput {
            id: NodeId::new(),
            name: "value".to_string(),
            source: NodeId::new(),
            source_attribute: Some("x".to_string()),
        }];
        let events = HashMap::from([(inputs[0].id, Event::new().with("x", 1.0))]);
        let params = Parameters::new();
        let mut ctx = ProcessorContext::new("sma", OutputStream::sink(), OutputStream::sink(), None);
        assert!(matches!(
            MovingAverage.process_event(&mut ctx, &Firing::new(&inputs, &events, &params)),
            Err(ProcessingError::NoMemory { .. })
        ));
    }
}
