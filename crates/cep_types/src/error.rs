//! Error types for the type system

use thiserror::Error;

use crate::value::ValueType;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TypeError {
    #[error("Unknown value type: {0}")]
    UnknownType(String),

    #[error("Attribute '{0}' already exists in this event type")]
    DuplicateAttribute(String),

    #[error("Attribute '{attribute}' expects {expected}, got {found}")]
    Coercion {
        attribute: String,
        expected: ValueType,
        found: String,
    },

    #[error("Event payload must be a JSON object")]
    NotAnObject,
}
