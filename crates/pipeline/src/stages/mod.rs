//! Built-in processors and sinks

pub mod channel_sink;
pub mod difference;
pub mod log_sink;
pub mod moving_average;
pub mod threshold;

pub use channel_sink::*;
pub use difference::*;
pub use log_sink::*;
pub use moving_average::*;
pub use threshold::*;

use crate::registry::NodeRegistry;

/// Register all built-in stages with the registry
pub fn register_builtin_stages(registry: &mut NodeRegistry) {
    registry.register_processor(MovingAverage::template());
    registry.register_processor(Threshold::template());
    registry.register_processor(Difference::template());
    registry.register_sink(LogSink::template());
}
