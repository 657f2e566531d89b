//! Declared value types and runtime values.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::TypeError;

/// The fixed set of types an attribute or input can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Boolean,
    Short,
    Int,
    Long,
    Float,
    Double,
    Object,
}

impl ValueType {
    pub const ALL: [ValueType; 8] = [
        ValueType::String,
        ValueType::Boolean,
        ValueType::Short,
        ValueType::Int,
        ValueType::Long,
        ValueType::Float,
        ValueType::Double,
        ValueType::Object,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Boolean => "boolean",
            ValueType::Short => "short",
            ValueType::Int => "int",
            ValueType::Long => "long",
            ValueType::Float => "float",
            ValueType::Double => "double",
            ValueType::Object => "object",
        }
    }

    pub fn is_numeric(self) -> bool {
        self.widening_rank().is_some()
    }

    // short -> int -> long -> float -> double
    fn widening_rank(self) -> Option<u8> {
        match self {
            ValueType::Short => Some(0),
            ValueType::Int => Some(1),
            ValueType::Long => Some(2),
            ValueType::Float => Some(3),
            ValueType::Double => Some(4),
            _ => None,
        }
    }

    /// Returns true if a value of this type can be stored where `target` is
    /// expected: the same type, any type into `object`, or numeric widening.
    pub fn is_assignable_to(self, target: ValueType) -> bool {
        if self == target || target == ValueType::Object {
            return true;
        }
        match (self.widening_rank(), target.widening_rank()) {
            (Some(from), Some(to)) => from <= to,
            _ => false,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ValueType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" | "str" => Ok(ValueType::String),
            "boolean" | "bool" => Ok(ValueType::Boolean),
            "short" => Ok(ValueType::Short),
            "int" | "integer" => Ok(ValueType::Int),
            "long" => Ok(ValueType::Long),
            "float" => Ok(ValueType::Float),
            "double" => Ok(ValueType::Double),
            "object" => Ok(ValueType::Object),
            other => Err(TypeError::UnknownType(other.to_string())),
        }
    }
}

/// A runtime value carried by an event or a parameter.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    String(String),
    Boolean(bool),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Object(serde_json::Value),
}

impl Value {
    /// The declared type this value naturally belongs to. `Null` has none.
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Value::Null => None,
            Value::String(_) => Some(ValueType::String),
            Value::Boolean(_) => Some(ValueType::Boolean),
            Value::Short(_) => Some(ValueType::Short),
            Value::Int(_) => Some(ValueType::Int),
            Value::Long(_) => Some(ValueType::Long),
            Value::Float(_) => Some(ValueType::Float),
            Value::Double(_) => Some(ValueType::Double),
            Value::Object(_) => Some(ValueType::Object),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Short(v) => Some(*v as f64),
            Value::Int(v) => Some(*v as f64),
            Value::Long(v) => Some(*v as f64),
            Value::Float(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer view of the value. Floating point values only convert when
    /// they carry no fractional part.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Short(v) => Some(*v as i64),
            Value::Int(v) => Some(*v as i64),
            Value::Long(v) => Some(*v),
            Value::Float(v) => exact_integer(*v as f64),
            Value::Double(v) => exact_integer(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Converts the value to `target`.
    ///
    /// `Null` coerces to every type. Integer targets reject values that do
    /// not fit exactly. Floating targets round to the nearest representable
    /// value, so `Double` to `Float` may lose precision.
    pub fn coerce_to(&self, target: ValueType) -> Option<Value> {
        if self.is_null() {
            return Some(Value::Null);
        }
        match target {
            ValueType::Object => Some(self.clone()),
            ValueType::String => self.as_str().map(|s| Value::String(s.to_string())),
            ValueType::Boolean => self.as_bool().map(Value::Boolean),
            ValueType::Short => self
                .as_i64()
                .and_then(|v| i16::try_from(v).ok())
                .map(Value::Short),
            ValueType::Int => self
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .map(Value::Int),
            ValueType::Long => self.as_i64().map(Value::Long),
            ValueType::Float => self.as_f64().map(|v| Value::Float(v as f32)),
            ValueType::Double => self.as_f64().map(Value::Double),
        }
    }

    /// Equality that treats numerically equal values of different widths as equal.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null => Json::Null,
            Value::String(s) => Json::String(s.clone()),
            Value::Boolean(b) => Json::Bool(*b),
            Value::Short(v) => Json::from(*v),
            Value::Int(v) => Json::from(*v),
            Value::Long(v) => Json::from(*v),
            Value::Float(v) => serde_json::Number::from_f64(*v as f64)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Double(v) => serde_json::Number::from_f64(*v)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Object(v) => v.clone(),
        }
    }
}

fn exact_integer(v: f64) -> Option<i64> {
    if v.is_finite() && v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Boolean(b),
            Json::String(s) => Value::String(s),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Long(i),
                None => Value::Double(n.as_f64().unwrap_or(f64::NAN)),
            },
            other => Value::Object(other),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Short(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::String(s) => f.write_str(s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Short(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Object(v) => write!(f, "{}", v),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_value_type() -> impl Strategy<Value = ValueType> {
        prop::sample::select(ValueType::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn assignability_is_reflexive(ty in any_value_type()) {
            prop_assert!(ty.is_assignable_to(ty));
        }

        #[test]
        fn everything_is_assignable_to_object(ty in any_value_type()) {
            prop_assert!(ty.is_assignable_to(ValueType::Object));
        }

        #[test]
        fn widening_is_transitive(
            a in any_value_type(),
            b in any_value_type(),
            c in any_value_type(),
        ) {
            if a.is_assignable_to(b) && b.is_assignable_to(c) {
                prop_assert!(a.is_assignable_to(c));
            }
        }

        #[test]
        fn long_coercion_keeps_the_number(v in any::<i32>()) {
            let coerced = Value::Long(v as i64).coerce_to(ValueType::Int);
            prop_assert_eq!(coerced, Some(Value::Int(v)));
        }
    }

    #[test]
    fn test_numeric_widening_pairs() {
        let widening = [
            (ValueType::Short, ValueType::Int),
            (ValueType::Short, ValueType::Double),
            (ValueType::Int, ValueType::Long),
            (ValueType::Int, ValueType::Float),
            (ValueType::Long, ValueType::Double),
            (ValueType::Float, ValueType::Double),
        ];
        for (from, to) in widening {
            assert!(from.is_assignable_to(to), "{} -> {}", from, to);
            assert!(!to.is_assignable_to(from), "{} -> {}", to, from);
        }
    }

    #[test]
    fn test_incompatible_kinds() {
        assert!(!ValueType::String.is_assignable_to(ValueType::Boolean));
        assert!(!ValueType::Boolean.is_assignable_to(ValueType::String));
        assert!(!ValueType::Double.is_assignable_to(ValueType::String));
        assert!(!ValueType::Object.is_assignable_to(ValueType::Double));
    }

    #[test]
    fn test_parse_value_type() {
        assert_eq!("Double".parse::<ValueType>(), Ok(ValueType::Double));
        assert_eq!("integer".parse::<ValueType>(), Ok(ValueType::Int));
        assert!("decimal".parse::<ValueType>().is_err());
    }

    #[test]
    fn test_coercion_rejects_lossy_conversions() {
        assert_eq!(Value::Long(70_000).coerce_to(ValueType::Short), None);
        assert_eq!(Value::Double(1.5).coerce_to(ValueType::Long), None);
        assert_eq!(
            Value::Double(2.0).coerce_to(ValueType::Long),
            Some(Value::Long(2))
        );
        assert_eq!(Value::from("x").coerce_to(ValueType::Double), None);
        // 2^63 is one past i64::MAX.
        assert_eq!(Value::Double(9_223_372_036_854_775_808.0).coerce_to(ValueType::Long), None);
        assert_eq!(
            Value::Double(-9_223_372_036_854_775_808.0).coerce_to(ValueType::Long),
            Some(Value::Long(i64::MIN))
        );
        assert_eq!(
            Value::Double(0.1).coerce_to(ValueType::Float),
            Some(Value::Float(0.1))
        );
    }

    #[test]
    fn test_json_conversion() {
        let value: Value = serde_json::from_str("42").unwrap();
        assert_eq!(value, Value::Long(42));
        let value: Value = serde_json::from_str("4.5").unwrap();
        assert_eq!(value, Value::Double(4.5));
        assert_eq!(serde_json::to_string(&Value::Int(7)).unwrap(), "7");
        assert!(Value::Int(3).loose_eq(&Value::Double(3.0)));
    }
}
