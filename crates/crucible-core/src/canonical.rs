//! Deterministic JSON canonicalization for content-addressed hashing.

use serde_json::Value;
use std::collections::BTreeMap;

/// Canonicalize a JSON value: object keys are sorted lexicographically at
/// every level, array order is preserved, and the result is serialized
/// without insignificant whitespace.
///
/// Two semantically-equivalent documents that differ only by object key
/// order or whitespace canonicalize to identical bytes.
#[must_use]
pub fn canonicalize(value: &Value) -> Vec<u8> {
    let sorted = sort_keys(value);
    // `serde_json::to_vec` never inserts insignificant whitespace.
    serde_json::to_vec(&sorted).expect("canonicalized Value always serializes")
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), sort_keys(v)))
                .collect();
            // Re-inserting into a serde_json::Map from a BTreeMap preserves
            // the sorted iteration order because Map is backed by an
            // insertion-ordered structure; we insert in sorted order here.
            let mut out = serde_json::Map::with_capacity(sorted.len());
            for (k, v) in sorted {
                out.insert(k, v);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_order_does_not_affect_output() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(canonicalize(&a), canonicalize(&b));
    }

    #[test]
    fn nested_key_order_does_not_affect_output() {
        let a = json!({"outer": {"z": 1, "y": 2}, "a": 1});
        let b = json!({"a": 1, "outer": {"y": 2, "z": 1}});
        assert_eq!(canonicalize(&a), canonicalize(&b));
    }

    #[test]
    fn array_order_is_preserved() {
        let a = json!({"xs": [1, 2, 3]});
        let b = json!({"xs": [3, 2, 1]});
        assert_ne!(canonicalize(&a), canonicalize(&b));
    }

    #[test]
    fn output_has_no_insignificant_whitespace() {
        let v = json!({"a": 1});
        let bytes = canonicalize(&v);
        assert_eq!(bytes, br#"{"a":1}"#);
    }

    #[test]
    fn different_values_canonicalize_differently() {
        let a = json!({"a": 1});
        let b = json!({"a": 2});
        assert_ne!(canonicalize(&a), canonicalize(&b));
    }
}
