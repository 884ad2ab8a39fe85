// SPDX-License-Identifier: MIT

use serde_json::json;

/// A JSON-like value used for inspected props/state/hook values.
///
/// Mirrors the shapes the runtime's dehydrated serialization can produce
/// after the bridge's cleaning pass (see `rdt-bridge`'s dehydration
/// cleaning): primitives, nested arrays/objects, an opaque marker for
/// function values, and a distinct marker for strings that were truncated
/// because they exceeded the 60-character preview cap.
///
/// `Object` keys iterate in the order `from_json` produced them, which is
/// sorted-by-key: it's built from `serde_json::Map`, and this workspace
/// doesn't enable serde_json's `preserve_order` feature, so the map is
/// `BTreeMap`-backed rather than insertion-ordered.
///
/// Serialization is hand-rolled rather than derived: `Function` and
/// `Truncated` need their own tagged JSON shapes so a CLI client can tell
/// them apart from an ordinary string.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(Vec<(String, Value)>),
    /// An opaque marker standing in for a function value the runtime sent.
    Function,
    /// A string preview truncated to `<57 chars>...` per the 60-char cap.
    Truncated(String),
}

impl Value {
    pub fn from_json(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => {
                Value::Array(arr.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(obj) => {
                Value::Object(obj.into_iter().map(|(k, v)| (k, Value::from_json(v))).collect())
            }
        }
    }

    /// Render as plain JSON for wire responses; `Function`/`Truncated`
    /// become small tagged objects so clients can distinguish them from a
    /// plain string without ambiguity.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => json!(*b),
            Value::Number(n) => json!(*n),
            Value::String(s) => json!(s),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(entries) => {
                let mut map = serde_json::Map::new();
                for (k, v) in entries {
                    map.insert(k.clone(), v.to_json());
                }
                serde_json::Value::Object(map)
            }
            Value::Function => json!({"__rdt_type": "function"}),
            Value::Truncated(preview) => json!({"__rdt_type": "truncated", "preview": preview}),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_object_round_trips_through_json() {
        let v = Value::from_json(json!({"a": 1, "b": [true, null, "x"]}));
        let rendered = v.to_json();
        assert_eq!(rendered["a"], json!(1.0));
        assert_eq!(rendered["b"], json!([true, null, "x"]));
    }

    #[test]
    fn function_marker_is_tagged_distinctly_from_string() {
        assert_ne!(Value::Function.to_json(), Value::String("function".into()).to_json());
    }

    proptest::proptest! {
        /// Any JSON built from bools, numbers, and strings survives a
        /// `from_json`/`to_json` round trip unchanged.
        #[test]
        fn primitive_json_round_trips(b in proptest::bool::ANY, n in -1e6f64..1e6, s in ".*") {
            proptest::prop_assert_eq!(Value::from_json(json!(b)).to_json(), json!(b));
            proptest::prop_assert_eq!(Value::from_json(json!(n)).to_json(), json!(n));
            proptest::prop_assert_eq!(Value::from_json(json!(s)).to_json(), json!(s));
        }
    }
}
