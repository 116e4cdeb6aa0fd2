//! Document flattening for the embedding stage.
//!
//! The indexer consumes each composite document as a single line of
//! `key: value` pairs. Nested objects contribute their keys joined to
//! the parent key with a separator; list elements contribute their
//! position. Empty lists and objects contribute nothing.
//!
//! # Example
//!
//! ```rust
//! use profile_harvest_core::flatten::{flatten, to_text};
//! use serde_json::json;
//!
//! let doc = json!({"user_id": 7, "user_skills": [{"skill_name": "Algebra"}]});
//! let pairs = flatten(doc.as_object().unwrap(), "_");
//! assert_eq!(to_text(&pairs), "user_id: 7 user_skills_0_skill_name: Algebra");
//! ```

use serde_json::{Map, Value};

/// Flatten an object into `(path, scalar)` pairs in document order.
pub fn flatten(object: &Map<String, Value>, separator: &str) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    for (key, value) in object {
        flatten_into(key.clone(), value, separator, &mut out);
    }
    out
}

fn flatten_into(path: String, value: &Value, separator: &str, out: &mut Vec<(String, Value)>) {
    match value {
        Value::Object(object) => {
            for (key, child) in object {
                flatten_into(format!("{}{}{}", path, separator, key), child, separator, out);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                flatten_into(format!("{}{}{}", path, separator, i), child, separator, out);
            }
        }
        scalar => out.push((path, scalar.clone())),
    }
}

/// Render flattened pairs as one space-separated `key: value` line.
///
/// Strings are written bare; numbers, booleans, and null use their
/// JSON spelling.
pub fn to_text(pairs: &[(String, Value)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| match value {
            Value::String(s) => format!("{}: {}", key, s),
            other => format!("{}: {}", key, other),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
