//! Query statement generation for compiled processors and sinks.

use std::collections::HashMap;

use crate::compiled::{CompiledExternalSink, CompiledInput, CompiledProcessor};
use crate::error::{ValidationError, ValidationResult};
use crate::io::ProcessorJoin;
use crate::node::NodeId;

/// Engine-safe event type name for a node: `_` followed by the
/// hyphen-free uuid, so it never starts with a digit.
pub fn event_name(id: NodeId) -> String {
    format!("_{}", id.as_uuid().simple())
}

/// Alias of the input at `index` in a FROM clause.
pub fn alias(index: usize) -> String {
    format!("_{}", index)
}

/// Column under which a processor statement exposes the event of input `index`.
pub fn properties_column(index: usize) -> String {
    format!("{}_properties", alias(index))
}

fn from_clause(inputs: &[CompiledInput]) -> String {
    inputs
        .iter()
        .enumerate()
        .map(|(i, input)| format!("{}.win:length(1) as {}", event_name(input.source), alias(i)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn where_clause(processor: &CompiledProcessor) -> ValidationResult<Option<String>> {
    if processor.joins.is_empty() {
        return Ok(None);
    }
    let positions: HashMap<NodeId, usize> = processor
        .inputs
        .iter()
        .enumerate()
        .map(|(i, input)| (input.id, i))
        .collect();
    let term = |id: NodeId, join: &ProcessorJoin| {
        let index = positions.get(&id).copied();
        let attribute = index.and_then(|i| processor.inputs[i].source_attribute.as_deref());
        match (index, attribute) {
            (Some(i), Some(attribute)) => Ok(format!("{}.{}", alias(i), attribute)),
            _ => Err(ValidationError::InvalidJoin {
                processor: processor.name.clone(),
                message: format!("join {} = {} does not resolve to selected attributes", join.left, join.right),
            }),
        }
    };
    let predicates = processor
        .joins
        .iter()
        .map(|join| -> ValidationResult<String> {
            Ok(format!("{} = {}", term(join.left, join)?, term(join.right, join)?))
        })
        .collect::<ValidationResult<Vec<_>>>()?;
    Ok(Some(predicates.join(" and ")))
}

/// `SELECT _0.* as _0_properties, ... FROM <src>.win:length(1) as _0, ... [WHERE ...]`
pub fn processor_statement(processor: &CompiledProcessor) -> ValidationResult<String> {
    if processor.inputs.is_empty() {
        return Err(ValidationError::NoInputs {
            node: processor.name.clone(),
        });
    }
    let select = (0..processor.inputs.len())
        .map(|i| format!("{}.* as {}", alias(i), properties_column(i)))
        .collect::<Vec<_>>()
        .join(", ");
    let mut statement = format!("SELECT {} FROM {}", select, from_clause(&processor.inputs));
    if let Some(predicates) = where_clause(processor)? {
        statement.push_str(" WHERE ");
        statement.push_str(&predicates);
    }
    Ok(statement)
}

/// `SELECT _0.*, ... FROM <src>.win:length(1) as _0, ...`
pub fn sink_statement(sink: &CompiledExternalSink) -> ValidationResult<String> {
    if sink.inputs.is_empty() {
        return Err(ValidationError::NoInputs {
            node: sink.name.clone(),
        });
    }
    let select = (0..sink.inputs.len())
        .map(|i| format!("{}.*", alias(i)))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!("SELECT {} FROM {}", select, from_clause(&sink.inputs)))
}
