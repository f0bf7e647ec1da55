// SPDX-License-Identifier: MIT OR Apache-2.0
//! RFC 7396 JSON Merge Patch: `apply` and the reverse operation `generate`.
//!
//! `null` removes a key, nested objects merge recursively, and arrays (like
//! any non-object value) replace wholesale rather than diffing element by
//! element.

use serde_json::{Map, Value};

/// Apply `patch` to `target` per RFC 7396.
#[must_use]
pub fn apply(target: &Value, patch: &Value) -> Value {
    let Value::Object(patch_obj) = patch else {
        return patch.clone();
    };
    let mut result = match target {
        Value::Object(obj) => obj.clone(),
        _ => Map::new(),
    };
    for (key, patch_value) in patch_obj {
        if patch_value.is_null() {
            result.remove(key);
        } else {
            let current = result.get(key).cloned().unwrap_or(Value::Null);
            result.insert(key.clone(), apply(&current, patch_value));
        }
    }
    Value::Object(result)
}

/// Compute the merge patch that transforms `before` into `after`:
/// `apply(before, generate(before, after))` deep-equals `after`.
#[must_use]
pub fn generate(before: &Value, after: &Value) -> Value {
    if before == after {
        return Value::Object(Map::new());
    }
    match (before, after) {
        (Value::Object(b), Value::Object(a)) => {
            let mut patch = Map::new();
            for (key, after_value) in a {
                match b.get(key) {
                    Some(before_value) if before_value == after_value => {}
                    Some(before_value) => {
                        patch.insert(key.clone(), generate(before_value, after_value));
                    }
                    None => {
                        patch.insert(key.clone(), after_value.clone());
                    }
                }
            }
            for key in b.keys() {
                if !a.contains_key(key) {
                    patch.insert(key.clone(), Value::Null);
                }
            }
            Value::Object(patch)
        }
        _ => after.clone(),
    }
}
