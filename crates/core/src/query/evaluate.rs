use std::cmp::Ordering;

use serde_json::Value;

use super::{Condition, ConditionOperator};

/// Finds a property in a serialized row.
///
/// Dotted names walk nested objects. Each segment matches the exact key
/// first, then any key equal ignoring ASCII case.
pub fn lookup_property<'a>(row: &'a Value, property: &str) -> Option<&'a Value> {
    property.split('.').try_fold(row, |node, segment| {
        let object = node.as_object()?;
        object.get(segment).or_else(|| {
            object
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(segment))
                .map(|(_, value)| value)
        })
    })
}

/// Returns true if the serialized row satisfies `condition`.
///
/// A missing property behaves like `null`: it only satisfies `IsNull`,
/// `NotEqual` and `NotIn`.
pub fn condition_matches(row: &Value, condition: &Condition) -> bool {
    let field = lookup_property(row, &condition.property_name).filter(|v| !v.is_null());
    let first = condition.values.first().map(String::as_str);

    match condition.operator {
        ConditionOperator::IsNull => field.is_none(),
        ConditionOperator::IsNotNull => field.is_some(),
        ConditionOperator::Equal => compares(field, first, Ordering::is_eq),
        ConditionOperator::NotEqual => !compares(field, first, Ordering::is_eq),
        ConditionOperator::GreaterThan => compares(field, first, Ordering::is_gt),
        ConditionOperator::GreaterThanOrEqual => compares(field, first, Ordering::is_ge),
        ConditionOperator::LessThan => compares(field, first, Ordering::is_lt),
        ConditionOperator::LessThanOrEqual => compares(field, first, Ordering::is_le),
        ConditionOperator::In => is_any_of(field, &condition.values),
        ConditionOperator::NotIn => !is_any_of(field, &condition.values),
        ConditionOperator::Contains => match (field, first) {
            (Some(Value::String(s)), Some(literal)) => s.contains(literal),
            (Some(Value::Array(items)), Some(literal)) => items
                .iter()
                .any(|item| compare_literal(item, literal).is_some_and(Ordering::is_eq)),
            _ => false,
        },
        ConditionOperator::StartsWith => match (field, first) {
            (Some(Value::String(s)), Some(literal)) => s.starts_with(literal),
            _ => false,
        },
        ConditionOperator::EndsWith => match (field, first) {
            (Some(Value::String(s)), Some(literal)) => s.ends_with(literal),
            _ => false,
        },
    }
}

fn compares(field: Option<&Value>, literal: Option<&str>, accept: fn(Ordering) -> bool) -> bool {
    match (field, literal) {
        (Some(value), Some(literal)) => compare_literal(value, literal).is_some_and(accept),
        _ => false,
    }
}

fn is_any_of(field: Option<&Value>, literals: &[String]) -> bool {
    field.is_some_and(|value| {
        literals
            .iter()
            .any(|literal| compare_literal(value, literal).is_some_and(Ordering::is_eq))
    })
}

/// Compares a JSON value with a string literal coerced to the value's type.
///
/// Returns `None` when the literal cannot be read as that type.
fn compare_literal(value: &Value, literal: &str) -> Option<Ordering> {
    match value {
        Value::Number(number) => {
            let lhs = number.as_f64()?;
            let rhs: f64 = literal.trim().parse().ok()?;
            lhs.partial_cmp(&rhs)
        }
        Value::Bool(flag) => {
            let rhs = match literal.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => return None,
            };
            Some(flag.cmp(&rhs))
        }
        Value::String(s) => Some(s.as_str().cmp(literal)),
        _ => None,
    }
}

/// Total order over optional JSON values used for sorting.
///
/// Missing and null sort first, then booleans, numbers, strings, and
/// anything else (compared as equal).
pub fn compare_fields(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
