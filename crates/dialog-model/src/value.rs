//! Declared value types of settings fields.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Value type of a field or reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueType {
    Boolean,
    Integer,
    Double,
    String,
    StringArray,
    /// String-valued enumeration; the payload names the enum type.
    Enum(Cow<'static, str>),
    /// Repeated group of element settings.
    Array,
    /// Nested settings group.
    Object,
    /// Button without a value of its own.
    Button,
}

impl ValueType {
    pub const fn enumeration(name: &'static str) -> Self {
        Self::Enum(Cow::Borrowed(name))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Double)
    }

    pub fn is_array_like(&self) -> bool {
        matches!(self, Self::Array | Self::StringArray)
    }

    /// Whether `value` is an acceptable stored value of this type.
    ///
    /// `null` is accepted for the non-primitive types.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Boolean, Value::Bool(_)) => true,
            (Self::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (Self::Double, Value::Number(_)) => true,
            (Self::String | Self::Enum(_), Value::String(_)) => true,
            (Self::StringArray, Value::Array(items)) => items.iter().all(Value::is_string),
            (Self::Array, Value::Array(_)) => true,
            (Self::Object, Value::Object(_)) => true,
            (
                Self::String | Self::Enum(_) | Self::StringArray | Self::Array | Self::Object,
                Value::Null,
            ) => true,
            _ => false,
        }
    }

    /// Convert an externally supplied value (e.g. a flow variable) to this type.
    ///
    /// Integers widen to doubles and the strings `"true"`/`"false"` convert to
    /// booleans; everything else must already have the right shape.
    pub fn coerce(&self, value: &Value) -> Option<Value> {
        match (self, value) {
            (Self::Boolean, Value::String(s)) => match s.to_ascii_lowercase().as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            (Self::Double, Value::Number(n)) => n
                .as_f64()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),
            (Self::Button, _) => None,
            (_, Value::Null) => None,
            _ if self.accepts(value) => Some(value.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => f.write_str("Boolean"),
            Self::Integer => f.write_str("Integer"),
            Self::Double => f.write_str("Double"),
            Self::String => f.write_str("String"),
            Self::StringArray => f.write_str("String[]"),
            Self::Enum(name) => write!(f, "Enum<{name}>"),
            Self::Array => f.write_str("Array"),
            Self::Object => f.write_str("Object"),
            Self::Button => f.write_str("Button"),
        }
    }
}
