//! Shared types for the CEP model compiler
//!
//! This crate contains the event type system used throughout the workspace:
//! declared value types and their compatibility rules, runtime values,
//! attributes, event schemas and the events that flow through a compiled model.

pub mod value;
pub mod attribute;
pub mod event;
pub mod error;

// Re-export commonly used types
pub use value::*;
pub use attribute::*;
pub use event::*;
pub use error::*;
