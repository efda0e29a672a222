//! Deterministic canonical serialization.
//!
//! The canonical form is the hashing input for every Verified Transfer
//! Packet, so two logically identical records must serialize byte-for-byte
//! identically regardless of how their fields were ordered upstream:
//!
//! - object keys are sorted by ordinal (byte) comparison at every nesting
//!   level, recursively; the writer sorts explicitly and never relies on the
//!   iteration order of the underlying map representation;
//! - sequences keep their original order, **except** sequences of flag-like
//!   objects (every element an object carrying a string `id`), which are
//!   sorted by that id, since upstream flag extraction is not required to be
//!   order-stable;
//! - `null` serializes as `null`; numbers and strings use `serde_json`'s
//!   standard formatting, applied consistently;
//! - the output is a single compact string with no insignificant whitespace.
//!
//! `canonicalize` is a pure function: no side effects, identical output on
//! repeated calls over logically equal structures.

use serde_json::Value;

use crate::error::{CaseError, CaseResult};

/// Serializes `value` into its canonical string form.
pub fn canonicalize(value: &Value) -> CaseResult<String> {
    let mut out = String::new();
    write_value(&mut out, value)?;
    Ok(out)
}

fn write_value(out: &mut String, value: &Value) -> CaseResult<()> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        // serde_json's scalar formatting is the canonical one, including
        // string escaping and number-to-text rules.
        Value::Number(_) | Value::String(_) => {
            let rendered = serde_json::to_string(value).map_err(CaseError::Serialization)?;
            out.push_str(&rendered);
        }
        Value::Array(items) => {
            out.push('[');
            if is_flag_sequence(items) {
                let mut sorted: Vec<&Value> = items.iter().collect();
                sorted.sort_by_key(|v| flag_id(v));
                for (i, item) in sorted.into_iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    write_value(out, item)?;
                }
            } else {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    write_value(out, item)?;
                }
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                let rendered_key =
                    serde_json::to_string(key).map_err(CaseError::Serialization)?;
                out.push_str(&rendered_key);
                out.push(':');
                // Sorted key lookup always succeeds; indexing a Map by a key
                // it yielded cannot miss.
                write_value(out, &map[key.as_str()])?;
            }
            out.push('}');
        }
    }
    Ok(())
}

/// True when every element of a non-empty sequence is an object carrying a
/// string `id`, the shape of a risk-flag list.
fn is_flag_sequence(items: &[Value]) -> bool {
    !items.is_empty() && items.iter().all(|v| flag_id(v).is_some())
}

fn flag_id(value: &Value) -> Option<&str> {
    value.as_object()?.get("id")?.as_str()
}
