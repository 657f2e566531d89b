//! Runtime events
//!
//! An event is a transient bag of named values. Events are created once per
//! firing and dropped after their last consumer; they conform loosely to an
//! [`EventType`] (extra attributes are carried, missing ones read as absent).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::attribute::EventType;
use crate::error::TypeError;
use crate::value::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event {
    data: BTreeMap<String, Value>,
}

impl Event {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(data: BTreeMap<String, Value>) -> Self {
        Self { data }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.data.insert(name.into(), value.into())
    }

    /// Builds an event from a JSON object, coercing every attribute declared by
    /// `schema` to its declared type. Undeclared attributes keep their inferred type.
    pub fn from_json(json: &serde_json::Value, schema: &EventType) -> Result<Self, TypeError> {
        let object = json.as_object().ok_or(TypeError::NotAnObject)?;
        let mut event = Event::new();
        for (name, raw) in object {
            let value = Value::from(raw.clone());
            let value = match schema.attribute(name) {
                Some(attribute) => value.coerce_to(attribute.value_type()).ok_or_else(|| {
                    TypeError::Coercion {
                        attribute: name.clone(),
                        expected: attribute.value_type(),
                        found: raw.to_string(),
                    }
                })?,
                None => value,
            };
            event.data.insert(name.clone(), value);
        }
        Ok(event)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.data.contains_key(name)
    }

    pub fn get_double(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    pub fn get_float(&self, name: &str) -> Option<f32> {
        self.get_double(name).map(|v| v as f32)
    }

    pub fn get_long(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn get_int(&self, name: &str) -> Option<i32> {
        self.get_long(name).and_then(|v| i32::try_from(v).ok())
    }

    pub fn get_short(&self, name: &str) -> Option<i16> {
        self.get_long(name).and_then(|v| i16::try_from(v).ok())
    }

    pub fn get_string(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_boolean(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    /// Merges two events; values from `other` win on conflicting names.
    pub fn union(&self, other: &Event) -> Event {
        let mut merged = self.clone();
        merged.merge(other);
        merged
    }

    pub fn merge(&mut self, other: &Event) {
        for (name, value) in &other.data {
            self.data.insert(name.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.data.iter()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_map(self) -> BTreeMap<String, Value> {
        self.data
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.data
                .iter()
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect(),
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.data.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        f.write_str("}")
    }
}
