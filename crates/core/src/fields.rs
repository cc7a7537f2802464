//! Dotted field-path extraction for the field-count ledger
//!
//! Walks an annotation document and returns every leaf path it contains, one
//! entry per occurrence. Nested objects contribute `parent.child` paths.
//! Arrays do NOT add an index segment: every element is walked under the same
//! path, so a list of three scalars under `body.value` yields `body.value`
//! three times. This multiset is exactly what the ledger adds or subtracts on
//! a mutation.

use serde_json::Value;

/// Extract all leaf field paths of a JSON document, one entry per occurrence
///
/// A non-object root yields no paths; empty objects and arrays contribute
/// nothing.
pub fn extract_field_paths(value: &Value) -> Vec<String> {
    let mut paths = Vec::new();
    if let Value::Object(map) = value {
        for (key, child) in map {
            walk(child, key, &mut paths);
        }
    }
    paths
}

fn walk(value: &Value, path: &str, paths: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                walk(child, &format!("{path}.{key}"), paths);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk(item, path, paths);
            }
        }
        _ => paths.push(path.to_string()),
    }
}
