use serde_json::Value;
use std::cmp::Ordering;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Failed to find key '{0}'")]
pub struct MissingKey(pub String);

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values: numbers numerically, strings
/// lexicographically, mixed kinds by kind.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => {
            match (a.as_i64(), b.as_i64()) {
                (Some(a), Some(b)) => a.cmp(&b),
                _ => a
                    .as_f64()
                    .partial_cmp(&b.as_f64())
                    .unwrap_or(Ordering::Equal),
            }
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ if rank(a) != rank(b) => rank(a).cmp(&rank(b)),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

/// Stable ascending sort on one top-level field.
///
/// Every record must carry `key`, otherwise nothing is reordered.
pub fn sort_by_field(records: &mut [Value], key: &str) -> Result<(), MissingKey> {
    if records.iter().any(|record| record.get(key).is_none()) {
        return Err(MissingKey(key.to_string()));
    }
    records.sort_by(|a, b| compare_values(&a[key], &b[key]));
    Ok(())
}
