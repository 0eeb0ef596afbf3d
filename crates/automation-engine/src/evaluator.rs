//! Condition evaluation
//!
//! A fixed table of comparison handlers keyed by declared value type and
//! operator. The table is closed: an unsupported (type, operator) pair or a
//! value that does not carry its declared type evaluates to false, never to
//! an error.

use homestead_core::{ConditionSpec, Operator, Value, ValueType};
use std::collections::HashMap;

/// Apply one comparison handler
///
/// Pure and total: any combination outside the supported table returns
/// false. No type coercion is attempted.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn compare(value_type: ValueType, operator: Operator, actual: &Value, expected: &Value) -> bool {
    match (value_type, actual, expected) {
        (ValueType::Number, Value::Number(a), Value::Number(e)) => match operator {
            Operator::Gt => a > e,
            Operator::Gte => a >= e,
            Operator::Lt => a < e,
            Operator::Lte => a <= e,
            Operator::Eq => a == e,
            Operator::Neq => a != e,
            Operator::Contains => false,
        },
        (ValueType::Boolean, Value::Bool(a), Value::Bool(e)) => match operator {
            Operator::Eq => a == e,
            Operator::Neq => a != e,
            _ => false,
        },
        (ValueType::String, Value::Text(a), Value::Text(e)) => match operator {
            Operator::Eq => a == e,
            Operator::Neq => a != e,
            Operator::Contains => a.contains(e.as_str()),
            _ => false,
        },
        _ => false,
    }
}

/// Evaluate a rule condition against an event field snapshot
///
/// Returns `None` when the snapshot does not carry the condition's field;
/// the caller skips the rule silently in that case.
#[must_use]
pub fn evaluate_condition(spec: &ConditionSpec, fields: &HashMap<String, Value>) -> Option<bool> {
    let actual = fields.get(&spec.field)?;
    Some(compare(spec.value_type, spec.operator, actual, &spec.expected))
}
