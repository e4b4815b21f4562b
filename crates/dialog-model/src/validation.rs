//! Field-level validations.
//!
//! Validations are checked when a dialog submission or a flow variable value
//! is applied to a settings leaf.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value::ValueType;

/// A constraint on a leaf value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Validation {
    Min {
        value: f64,
        #[serde(default)]
        exclusive: bool,
    },
    Max {
        value: f64,
        #[serde(default)]
        exclusive: bool,
    },
    /// Whole-string regular expression match.
    Pattern { pattern: String },
    /// Minimum number of characters (strings) or items (arrays).
    MinLength { length: usize },
    /// Maximum number of characters (strings) or items (arrays).
    MaxLength { length: usize },
    OneOf { values: Vec<String> },
    NotBlank,
}

impl Validation {
    /// Check `value`, returning a human-readable reason when it is rejected.
    ///
    /// `null` passes every validation; presence is a matter of the value type.
    pub fn check(&self, value: &Value) -> Result<(), String> {
        if value.is_null() {
            return Ok(());
        }
        match self {
            Self::Min {
                value: bound,
                exclusive,
            } => {
                let number = as_number(value)?;
                let ok = if *exclusive { number > *bound } else { number >= *bound };
                if ok {
                    Ok(())
                } else if *exclusive {
                    Err(format!("must be greater than {bound}"))
                } else {
                    Err(format!("must be at least {bound}"))
                }
            }
            Self::Max {
                value: bound,
                exclusive,
            } => {
                let number = as_number(value)?;
                let ok = if *exclusive { number < *bound } else { number <= *bound };
                if ok {
                    Ok(())
                } else if *exclusive {
                    Err(format!("must be less than {bound}"))
                } else {
                    Err(format!("must be at most {bound}"))
                }
            }
            Self::Pattern { pattern } => {
                let text = as_text(value)?;
                let regex = Regex::new(&format!("^(?:{pattern})$"))
                    .map_err(|err| format!("invalid pattern '{pattern}': {err}"))?;
                if regex.is_match(text) {
                    Ok(())
                } else {
                    Err(format!("must match the pattern '{pattern}'"))
                }
            }
            Self::MinLength { length } => {
                if measure(value)? >= *length {
                    Ok(())
                } else {
                    Err(format!("must have at least {length} characters or items"))
                }
            }
            Self::MaxLength { length } => {
                if measure(value)? <= *length {
                    Ok(())
                } else {
                    Err(format!("must have at most {length} characters or items"))
                }
            }
            Self::OneOf { values } => {
                let text = as_text(value)?;
                if values.iter().any(|allowed| allowed == text) {
                    Ok(())
                } else {
                    Err(format!("must be one of {}", values.join(", ")))
                }
            }
            Self::NotBlank => {
                if as_text(value)?.trim().is_empty() {
                    Err("must not be blank".to_string())
                } else {
                    Ok(())
                }
            }
        }
    }
}

fn as_number(value: &Value) -> Result<f64, String> {
    value
        .as_f64()
        .ok_or_else(|| format!("expected a number, got {value}"))
}

fn as_text(value: &Value) -> Result<&str, String> {
    value
        .as_str()
        .ok_or_else(|| format!("expected a string, got {value}"))
}

fn measure(value: &Value) -> Result<usize, String> {
    match value {
        Value::String(s) => Ok(s.chars().count()),
        Value::Array(items) => Ok(items.len()),
        other => Err(format!("expected a string or an array, got {other}")),
    }
}

/// Check the type and every validation of a leaf.
pub fn validate_value(
    value_type: &ValueType,
    validations: &[Validation],
    value: &Value,
) -> Result<(), String> {
    if !value_type.accepts(value) {
        return Err(format!("expected a value of type {value_type}, got {value}"));
    }
    validations.iter().try_for_each(|validation| validation.check(value))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn numeric_bounds() {
        let min = Validation::Min {
            value: 1.0,
            exclusive: false,
        };
        assert!(min.check(&json!(1)).is_ok());
        assert_eq!(min.check(&json!(0.5)).unwrap_err(), "must be at least 1");
        let max = Validation::Max {
            value: 10.0,
            exclusive: true,
        };
        assert!(max.check(&json!(10)).is_err());
    }

    #[test]
    fn pattern_matches_whole_string() {
        let validation = Validation::Pattern {
            pattern: "[a-z]+".to_string(),
        };
        assert!(validation.check(&json!("abc")).is_ok());
        assert!(validation.check(&json!("abc1")).is_err());
    }

    #[test]
    fn type_is_checked_before_validations() {
        let result = validate_value(&ValueType::Integer, &[], &json!("12"));
        assert_eq!(
            result.unwrap_err(),
            "expected a value of type Integer, got \"12\""
        );
        assert!(validate_value(&ValueType::String, &[Validation::NotBlank], &json!(null)).is_ok());
    }

    #[test]
    fn validations_deserialize_tagged() {
        let parsed: Vec<Validation> = serde_json::from_value(json!([
            {"kind": "min", "value": 0},
            {"kind": "notBlank"},
            {"kind": "oneOf", "values": ["A", "B"]}
        ]))
        .unwrap();
        assert_eq!(parsed.len(), 3);
        assert!(parsed[2].check(&json!("C")).is_err());
    }
}
