// SPDX-License-Identifier: MIT

//! Dehydration cleaning (spec §4.4): the runtime's serialization replaces
//! large/cyclic values with `{type, preview_short, ...}` objects and
//! function values with a sentinel; the bridge collapses both into
//! `rdt_core::Value` markers a CLI client can render.

use rdt_core::{Hook, InspectedElement, Value};
use serde_json::Value as Json;

const PREVIEW_LEN: usize = 57;
const MAX_STRING_LEN: usize = 60;

pub fn clean_value(raw: &Json) -> Value {
    match raw {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
        Json::String(s) => clean_string(s),
        Json::Array(items) => Value::Array(items.iter().map(clean_value).collect()),
        Json::Object(map) => {
            if map.get("type").and_then(Json::as_str) == Some("function") {
                return Value::Function;
            }
            if let Some(preview) = map.get("preview_short").and_then(Json::as_str) {
                return clean_string(preview);
            }
            Value::Object(map.iter().map(|(k, v)| (k.clone(), clean_value(v))).collect())
        }
    }
}

fn clean_string(s: &str) -> Value {
    let encoded_len = serde_json::to_string(s).map(|e| e.len()).unwrap_or(s.len());
    if encoded_len <= MAX_STRING_LEN {
        return Value::String(s.to_string());
    }
    let preview: String = s.chars().take(PREVIEW_LEN).collect();
    Value::Truncated(format!("{preview}..."))
}

/// Builds a cleaned `InspectedElement` from an `inspectedElement` payload's
/// `value` object (spec §6.1 E5 example shape).
pub fn clean_inspected_element(id: u32, raw: &Json) -> InspectedElement {
    let display_name = raw.get("displayName").and_then(Json::as_str).unwrap_or("Anonymous").to_string();
    let kind = raw
        .get("type")
        .and_then(Json::as_i64)
        .map(rdt_core::ElementKind::from_wire)
        .unwrap_or(rdt_core::ElementKind::Other);
    let key = raw.get("key").and_then(Json::as_str).map(str::to_string);
    let props = raw
        .get("props")
        .and_then(Json::as_object)
        .map(|map| map.iter().map(|(k, v)| (k.clone(), clean_value(v))).collect())
        .unwrap_or_default();
    let state = raw
        .get("state")
        .and_then(Json::as_object)
        .map(|map| map.iter().map(|(k, v)| (k.clone(), clean_value(v))).collect());
    let hooks = raw.get("hooks").and_then(Json::as_array).map(|arr| arr.iter().map(clean_hook).collect()).unwrap_or_default();
    let rendered_at = raw.get("renderedAt").and_then(Json::as_i64);

    InspectedElement { id, display_name, kind, key, props, state, hooks, rendered_at }
}

fn clean_hook(raw: &Json) -> Hook {
    Hook {
        name: raw.get("name").and_then(Json::as_str).unwrap_or_default().to_string(),
        value: raw.get("value").map(clean_value).unwrap_or(Value::Null),
        sub_hooks: raw.get("subHooks").and_then(Json::as_array).map(|arr| arr.iter().map(clean_hook).collect()),
    }
}
