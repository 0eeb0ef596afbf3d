//! Typed sensor/command values and comparison vocabulary

use serde::{Deserialize, Serialize};

/// A sensor or command value
///
/// Condition and action payloads are restricted to this closed set of
/// shapes; anything that is not a scalar lands in `Structured` and never
/// participates in comparisons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Boolean value
    Bool(bool),
    /// Numeric value (all numbers are carried as f64)
    Number(f64),
    /// Text value
    Text(String),
    /// Structured payload (object, array, or null)
    Structured(serde_json::Value),
}

/// The comparable value kinds a condition may declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Number,
    Boolean,
    String,
}

/// Comparison operators available to condition rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Neq,
    Contains,
}

impl Value {
    /// Check whether this value carries the declared kind
    #[must_use]
    pub fn is_kind(&self, kind: ValueType) -> bool {
        matches!(
            (self, kind),
            (Value::Number(_), ValueType::Number)
                | (Value::Bool(_), ValueType::Boolean)
                | (Value::Text(_), ValueType::String)
        )
    }

    /// Numeric content, if this is a number
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

/// One step of a device command (e.g. `{"name": "speed", "value": "4"}`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionStep {
    pub name: String,
    pub value: Value,
}

impl ActionStep {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// An inclusive numeric range with optional bounds
///
/// An absent bound leaves that side unbounded; a rule with neither bound
/// would match everything and is rejected at the mutation boundary.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ValueRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ge: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub le: Option<f64>,
}

impl ValueRange {
    /// Range with only a lower bound
    #[must_use]
    pub fn at_least(ge: f64) -> Self {
        Self {
            ge: Some(ge),
            le: None,
        }
    }

    /// Range with only an upper bound
    #[must_use]
    pub fn at_most(le: f64) -> Self {
        Self {
            ge: None,
            le: Some(le),
        }
    }

    /// Range bounded on both sides
    #[must_use]
    pub fn between(ge: f64, le: f64) -> Self {
        Self {
            ge: Some(ge),
            le: Some(le),
        }
    }

    /// Inclusive containment check
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        if let Some(ge) = self.ge {
            if value < ge {
                return false;
            }
        }
        if let Some(le) = self.le {
            if value > le {
                return false;
            }
        }
        true
    }

    /// A range is well-formed when at least one bound is present and the
    /// bounds are not inverted.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match (self.ge, self.le) {
            (None, None) => false,
            (Some(ge), Some(le)) => ge <= le,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_lower_bound_is_inclusive() {
        let range = ValueRange::at_least(20.0);
        assert!(range.contains(25.0));
        assert!(range.contains(20.0));
        assert!(!range.contains(19.0));
    }

    #[test]
    fn range_upper_bound_is_inclusive() {
        let range = ValueRange::at_most(30.0);
        assert!(range.contains(30.0));
        assert!(!range.contains(31.0));
    }

    #[test]
    fn range_both_bounds() {
        let range = ValueRange::between(20.0, 30.0);
        assert!(range.contains(20.0));
        assert!(range.contains(30.0));
        assert!(range.contains(24.5));
        assert!(!range.contains(19.99));
        assert!(!range.contains(30.01));
    }

    #[test]
    fn range_without_bounds_is_invalid() {
        assert!(!ValueRange::default().is_valid());
        assert!(ValueRange::at_least(1.0).is_valid());
        assert!(!ValueRange::between(5.0, 1.0).is_valid());
    }

    #[test]
    fn value_kind_check() {
        assert!(Value::Number(1.0).is_kind(ValueType::Number));
        assert!(Value::Bool(true).is_kind(ValueType::Boolean));
        assert!(Value::from("on").is_kind(ValueType::String));
        assert!(!Value::from("on").is_kind(ValueType::Number));
        assert!(!Value::Structured(serde_json::Value::Null).is_kind(ValueType::String));
    }

    #[test]
    fn value_deserializes_untagged() {
        assert_eq!(
            serde_json::from_str::<Value>("21.5").unwrap(),
            Value::Number(21.5)
        );
        assert_eq!(
            serde_json::from_str::<Value>("true").unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            serde_json::from_str::<Value>("\"high\"").unwrap(),
            Value::Text("high".to_string())
        );
        assert!(matches!(
            serde_json::from_str::<Value>("{\"r\":255}").unwrap(),
            Value::Structured(_)
        ));
    }
}
