//! Typed access to tool-call arguments.
//!
//! The transport is expected to validate arguments against the catalogue
//! schemas, but nothing here relies on that: every accessor reports a missing
//! or mistyped value as an [`ArgumentError`] naming the field.

use serde_json::{Map, Value};

use crate::error::ArgumentError;

/// The `arguments` object of a tool call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: Map<String, Value>,
}

impl Arguments {
    pub fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// Builds arguments from any JSON value; `null` means no arguments.
    pub fn from_value(value: Value) -> Result<Self, ArgumentError> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(values) => Ok(Self { values }),
            other => Err(ArgumentError::new(
                "arguments",
                format!("expected an object, got {}", kind(&other)),
            )),
        }
    }

    /// Returns the raw value, treating JSON `null` as absent.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field).filter(|v| !v.is_null())
    }

    /// A required, non-empty string.
    pub fn required_str(&self, field: &str) -> Result<&str, ArgumentError> {
        match self.optional_str(field)? {
            Some(s) => Ok(s),
            None => Err(ArgumentError::missing(field)),
        }
    }

    /// A required string that may be empty.
    ///
    /// Only a missing key or `null` counts as absent.
    pub fn required_text(&self, field: &str) -> Result<&str, ArgumentError> {
        match self.get(field) {
            None => Err(ArgumentError::missing(field)),
            Some(Value::String(s)) => Ok(s.as_str()),
            Some(other) => Err(ArgumentError::new(
                field,
                format!("expected a string, got {}", kind(other)),
            )),
        }
    }

    /// An optional string. Blank strings count as absent.
    pub fn optional_str(&self, field: &str) -> Result<Option<&str>, ArgumentError> {
        match self.get(field) {
            None => Ok(None),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(ArgumentError::new(
                field,
                format!("expected a string, got {}", kind(other)),
            )),
        }
    }

    /// An optional boolean, falling back to `default`.
    ///
    /// The strings `"true"` and `"false"` are accepted as well.
    pub fn bool_or(&self, field: &str, default: bool) -> Result<bool, ArgumentError> {
        match self.get(field) {
            None => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(ArgumentError::new(field, format!("expected a boolean, got '{s}'"))),
            },
            Some(other) => Err(ArgumentError::new(
                field,
                format!("expected a boolean, got {}", kind(other)),
            )),
        }
    }

    /// An optional integer, falling back to `default`.
    ///
    /// Numeric strings are accepted. Fractional values are rejected.
    pub fn int_or(&self, field: &str, default: i64) -> Result<i64, ArgumentError> {
        match self.get(field) {
            None => Ok(default),
            Some(Value::Number(n)) => n
                .as_i64()
                .ok_or_else(|| ArgumentError::new(field, format!("expected an integer, got {n}"))),
            Some(Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| ArgumentError::new(field, format!("expected an integer, got '{s}'"))),
            Some(other) => Err(ArgumentError::new(
                field,
                format!("expected an integer, got {}", kind(other)),
            )),
        }
    }
}

impl From<Map<String, Value>> for Arguments {
    fn from(values: Map<String, Value>) -> Self {
        Self::new(values)
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
