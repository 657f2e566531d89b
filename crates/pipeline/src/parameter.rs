//! Node parameters.

use cep_types::{Value, ValueType};
use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};

/// A single typed, optionally bounded, setting of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    id: u32,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "type")]
    value_type: ValueType,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    min: Option<f64>,
    #[serde(default)]
    max: Option<f64>,
}

impl Parameter {
    pub fn new(id: u32, name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            value_type,
            value: Value::Null,
            required: false,
            min: None,
            max: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    /// Sets a default value. Values that do not coerce to the declared type
    /// are stored as-is and reported by `validate`.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.value = value.coerce_to(self.value_type).unwrap_or(value);
        self
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }

    /// Stores `value` after coercing it to the declared type.
    pub fn set_value(&mut self, node: &str, value: Value) -> ValidationResult<()> {
        let coerced = value
            .coerce_to(self.value_type)
            .ok_or_else(|| ValidationError::InvalidParameter {
                node: node.to_string(),
                parameter: self.name.clone(),
                message: format!("expects {}, got '{}'", self.value_type, value),
            })?;
        self.value = coerced;
        Ok(())
    }

    pub fn validate(&self, node: &str) -> ValidationResult<()> {
        if self.value.is_null() {
            if self.required {
                return Err(ValidationError::MissingParameter {
                    node: node.to_string(),
                    parameter: self.name.clone(),
                });
            }
            return Ok(());
        }

        let invalid = |message: String| ValidationError::InvalidParameter {
            node: node.to_string(),
            parameter: self.name.clone(),
            message,
        };

        let fits = self
            .value
            .value_type()
            .map(|ty| ty.is_assignable_to(self.value_type))
            .unwrap_or(false);
        if !fits {
            return Err(invalid(format!(
                "expects {}, got '{}'",
                self.value_type, self.value
            )));
        }

        if let Some(v) = self.value.as_f64() {
            if let Some(min) = self.min {
                if v < min {
                    return Err(invalid(format!("must be at least {}, got {}", min, v)));
                }
            }
            if let Some(max) = self.max {
                if v > max {
                    return Err(invalid(format!("must be at most {}, got {}", max, v)));
                }
            }
        }
        Ok(())
    }
}

/// Lowercase, spaces to underscores, everything outside `[a-z0-9_]` removed.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c == ' ' { '_' } else { c })
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .collect()
}

/// Parameters of one node, unique by numeric id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters {
    items: Vec<Parameter>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a parameter, replacing any parameter with the same id.
    pub fn insert(&mut self, parameter: Parameter) -> Option<Parameter> {
        match self.items.iter_mut().find(|p| p.id == parameter.id) {
            Some(existing) => Some(std::mem::replace(existing, parameter)),
            None => {
                self.items.push(parameter);
                None
            }
        }
    }

    pub fn get(&self, id: u32) -> Option<&Parameter> {
        self.items.iter().find(|p| p.id == id)
    }

    /// Looks a parameter up by display name or by its normalized form.
    pub fn by_name(&self, name: &str) -> Option<&Parameter> {
        let normalized = normalize_name(name);
        self.items
            .iter()
            .find(|p| p.name == name)
            .or_else(|| self.items.iter().find(|p| p.normalized_name() == normalized))
    }

    pub fn by_name_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        let normalized = normalize_name(name);
        let index = self
            .items
            .iter()
            .position(|p| p.name == name)
            .or_else(|| self.items.iter().position(|p| p.normalized_name() == normalized))?;
        self.items.get_mut(index)
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.by_name(name).map(Parameter::value).filter(|v| !v.is_null())
    }

    pub fn double(&self, name: &str) -> Option<f64> {
        self.value(name).and_then(Value::as_f64)
    }

    pub fn long(&self, name: &str) -> Option<i64> {
        self.value(name).and_then(Value::as_i64)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn validate(&self, node: &str) -> ValidationResult<()> {
        self.items.iter().try_for_each(|p| p.validate(node))
    }
}
