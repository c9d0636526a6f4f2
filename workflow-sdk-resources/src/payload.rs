//! Request payload helpers.

use crate::error::{ResourceError, ResourceResult};
use serde::Serialize;
use serde_json::Value;

/// Drop top-level fields that carry no value.
///
/// Fields that are `null`, empty strings, empty arrays or empty objects are
/// removed from an object. Nested values are left alone, and non-object
/// values are returned unchanged.
pub fn prune_empty(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, field)| !is_empty(field))
                .collect(),
        ),
        other => other,
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Serialize a request and prune its empty fields.
pub(crate) fn to_payload<T: Serialize>(request: &T) -> ResourceResult<Value> {
    Ok(prune_empty(serde_json::to_value(request)?))
}

/// Reject namespace labels containing a period.
pub(crate) fn check_namespace<S: AsRef<str>>(namespace: &[S]) -> ResourceResult<()> {
    match namespace.iter().find(|label| label.as_ref().contains('.')) {
        Some(label) => Err(ResourceError::InvalidNamespace(label.as_ref().to_string())),
        None => Ok(()),
    }
}
