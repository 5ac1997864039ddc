//! Lookup of loosely structured inbound payloads by ordered dotted paths.

use serde_json::Value;

/// Resolves a dotted path (`"data.message.id"`) against a JSON tree.
///
/// Array elements can be addressed by index (`"messages.0.id"`).
pub fn pick<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, key| match current {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Returns the value of the first candidate path that is present.
///
/// A value counts as present unless it is missing, `null` or the empty string.
pub fn first_value<'a>(value: &'a Value, paths: &[&str]) -> Option<&'a Value> {
    paths
        .iter()
        .filter_map(|path| pick(value, path))
        .find(|candidate| is_present(candidate))
}

/// Like [`first_value`], coercing strings, numbers and booleans to text.
///
/// The first present candidate wins even if it cannot be coerced.
pub fn first_string(value: &Value, paths: &[&str]) -> Option<String> {
    first_value(value, paths).and_then(|found| match found {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}
