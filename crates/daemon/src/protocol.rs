// SPDX-License-Identifier: MIT

//! Local IPC request/response types (spec §6.2): newline-delimited JSON,
//! one request and one response per line.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `get-component`/`profile-report`'s `id: int|string` field — either a
/// numeric node id or an `@cN` label (spec §4.3's `resolveId`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComponentRef {
    Id(u32),
    Label(String),
}

impl ComponentRef {
    pub fn as_str(&self) -> String {
        match self {
            ComponentRef::Id(id) => id.to_string(),
            ComponentRef::Label(label) => label.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Request {
    Ping,
    Status,
    GetTree {
        depth: Option<u32>,
    },
    GetComponent {
        id: ComponentRef,
    },
    Find {
        name: String,
        #[serde(default)]
        exact: bool,
    },
    Count,
    ProfileStart {
        name: Option<String>,
    },
    ProfileStop,
    ProfileReport {
        #[serde(rename = "componentId")]
        component_id: ComponentRef,
    },
    ProfileSlow {
        limit: Option<usize>,
    },
    ProfileRerenders {
        limit: Option<usize>,
    },
    ProfileTimeline {
        limit: Option<usize>,
    },
    ProfileCommit {
        index: usize,
        limit: Option<usize>,
    },
    Wait {
        condition: String,
        name: Option<String>,
        timeout: Option<u64>,
    },
}

/// `{ok, data?, error?, label?, hint?}` per spec §6.2.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl Response {
    pub fn ok(data: Value) -> Self {
        Self { ok: true, data: Some(data), ..Default::default() }
    }

    pub fn ok_with_hint(data: Value, hint: Option<String>) -> Self {
        Self { ok: true, data: Some(data), hint, ..Default::default() }
    }

    pub fn ok_with_label(data: Value, label: String) -> Self {
        Self { ok: true, data: Some(data), label: Some(label), ..Default::default() }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self { ok: false, error: Some(message.into()), ..Default::default() }
    }

    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"ok":false,"error":"internal"}"#.to_string())
    }
}

/// The `type` tags `Request`'s `#[serde(tag = "type", rename_all =
/// "kebab-case")]` derive produces, kept in sync by hand so `parse_request`
/// can tell "no such command" apart from "right command, bad payload".
const KNOWN_KINDS: &[&str] = &[
    "ping",
    "status",
    "get-tree",
    "get-component",
    "find",
    "count",
    "profile-start",
    "profile-stop",
    "profile-report",
    "profile-slow",
    "profile-rerenders",
    "profile-timeline",
    "profile-commit",
    "wait",
];

/// Parses one line of IPC input; a JSON/shape error maps to the `Transport`
/// kind (spec §7): the connection stays open, one bad line gets one error
/// response.
pub fn parse_request(line: &str) -> Result<Request, Response> {
    let raw: Value = serde_json::from_str(line).map_err(|_| Response::err("Invalid JSON"))?;
    let Some(kind) = raw.get("type").and_then(Value::as_str) else {
        return Err(Response::err("Missing \"type\" field"));
    };
    if !KNOWN_KINDS.contains(&kind) {
        return Err(Response::err(format!("Unknown command: {kind}")));
    }
    let kind = kind.to_string();
    serde_json::from_value(raw.clone())
        .map_err(|e| Response::err(format!("Invalid payload for {kind}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_ref_parses_numeric_and_label_forms() {
        let by_id: ComponentRef = serde_json::from_str("3").unwrap();
        assert_eq!(by_id, ComponentRef::Id(3));
        let by_label: ComponentRef = serde_json::from_str("\"@c2\"").unwrap();
        assert_eq!(by_label, ComponentRef::Label("@c2".to_string()));
    }

    #[test]
    fn unknown_type_is_reported_by_name() {
        let err = parse_request(r#"{"type":"bogus"}"#).unwrap_err();
        assert_eq!(err.error.as_deref(), Some("Unknown command: bogus"));
    }

    #[test]
    fn invalid_json_reports_transport_error() {
        let err = parse_request("not json").unwrap_err();
        assert_eq!(err.error.as_deref(), Some("Invalid JSON"));
    }

    #[test]
    fn known_kind_with_missing_field_is_not_reported_as_unknown() {
        let err = parse_request(r#"{"type":"get-component"}"#).unwrap_err();
        let message = err.error.unwrap();
        assert!(message.starts_with("Invalid payload for get-component:"), "{message}");
    }

    #[test]
    fn get_tree_depth_is_optional() {
        let req = parse_request(r#"{"type":"get-tree"}"#).unwrap();
        assert!(matches!(req, Request::GetTree { depth: None }));
    }

    #[test]
    fn response_omits_absent_optional_fields() {
        let line = Response::ok(serde_json::json!({"x": 1})).to_line();
        assert!(!line.contains("\"error\""));
        assert!(!line.contains("\"hint\""));
    }
}
