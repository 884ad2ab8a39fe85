// SPDX-License-Identifier: MIT

//! Tolerant parsing of `profilingData` payloads (spec §4.5).
//!
//! The runtime's payload shape varies in three independent ways: commits
//! may be nested under `dataForRoots[].commitData` or sit flat under
//! `commitData`; duration maps may be tuple pairs or flat interleaved
//! values; `changeDescriptions` may be a JSON object or a sequence of
//! `[id, desc]` pairs. This mirrors the structural variance documented in
//! the corresponding React DevTools profiler export parser.

use std::collections::HashMap;

use rdt_core::{ChangeDescription, Commit, NodeId};
use serde_json::Value;

pub fn raw_commits(payload: &Value) -> Vec<&Value> {
    if let Some(roots) = payload.get("dataForRoots").and_then(Value::as_array) {
        roots
            .iter()
            .flat_map(|root| root.get("commitData").and_then(Value::as_array).into_iter().flatten())
            .collect()
    } else if let Some(commits) = payload.get("commitData").and_then(Value::as_array) {
        commits.iter().collect()
    } else {
        Vec::new()
    }
}

pub fn parse_commit(v: &Value) -> Commit {
    Commit {
        timestamp: v.get("timestamp").and_then(Value::as_f64).unwrap_or(0.0),
        duration: v.get("duration").and_then(Value::as_f64).unwrap_or(0.0),
        actual_durations: parse_duration_map(v.get("fiberActualDurations")),
        self_durations: parse_duration_map(v.get("fiberSelfDurations")),
        change_descriptions: parse_change_descriptions(v.get("changeDescriptions")),
    }
}

fn parse_duration_map(v: Option<&Value>) -> HashMap<NodeId, f64> {
    let Some(arr) = v.and_then(Value::as_array) else { return HashMap::new() };
    let mut out = HashMap::new();
    let tuples = !arr.is_empty() && arr.iter().all(Value::is_array);
    if tuples {
        for pair in arr {
            let Some(p) = pair.as_array() else { continue };
            if let [id, dur, ..] = p.as_slice() {
                if let (Some(id), Some(dur)) = (id.as_u64(), dur.as_f64()) {
                    out.insert(id as NodeId, dur);
                }
            }
        }
    } else {
        let mut it = arr.iter();
        while let (Some(id_v), Some(dur_v)) = (it.next(), it.next()) {
            if let (Some(id), Some(dur)) = (id_v.as_u64(), dur_v.as_f64()) {
                out.insert(id as NodeId, dur);
            }
        }
    }
    out
}

fn parse_change_descriptions(v: Option<&Value>) -> HashMap<NodeId, ChangeDescription> {
    match v {
        Some(Value::Object(map)) => map
            .iter()
            .filter_map(|(k, v)| k.parse::<u64>().ok().map(|id| (id as NodeId, parse_change_description(v))))
            .collect(),
        Some(Value::Array(arr)) => arr
            .iter()
            .filter_map(|pair| {
                let p = pair.as_array()?;
                let (id, desc) = (p.first()?, p.get(1)?);
                Some((id.as_u64()? as NodeId, parse_change_description(desc)))
            })
            .collect(),
        _ => HashMap::new(),
    }
}

fn parse_change_description(v: &Value) -> ChangeDescription {
    let strings = |key: &str| -> Option<Vec<String>> {
        v.get(key)?.as_array().map(|a| a.iter().filter_map(|x| x.as_str().map(str::to_string)).collect())
    };
    ChangeDescription {
        did_hooks_change: v.get("didHooksChange").and_then(Value::as_bool).unwrap_or(false),
        is_first_mount: v.get("isFirstMount").and_then(Value::as_bool).unwrap_or(false),
        props: strings("props"),
        state: strings("state"),
        hooks: v
            .get("hooks")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(|x| x.as_u64().map(|n| n as usize)).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use yare::parameterized;

    #[test]
    fn duration_map_accepts_tuple_and_interleaved_shapes() {
        let tuples = json!([[1, 10.0], [2, 5.0]]);
        let interleaved = json!([1, 10.0, 2, 5.0]);
        assert_eq!(parse_duration_map(Some(&tuples)), parse_duration_map(Some(&interleaved)));
    }

    #[parameterized(
        empty = {json!([]), 0},
        single = {json!([[1, 10.0]]), 1},
        several = {json!([[1, 10.0], [2, 5.0], [3, 0.0]]), 3},
    )]
    fn duration_map_tuple_shape_counts_entries(input: Value, expected_len: usize) {
        assert_eq!(parse_duration_map(Some(&input)).len(), expected_len);
    }

    #[test]
    fn change_descriptions_accept_map_and_pair_seq_shapes() {
        let as_map = json!({"1": {"props": ["x"]}, "2": {"isFirstMount": true}});
        let as_seq = json!([[1, {"props": ["x"]}], [2, {"isFirstMount": true}]]);
        assert_eq!(parse_change_descriptions(Some(&as_map)), parse_change_descriptions(Some(&as_seq)));
    }

    #[test]
    fn nested_and_flat_commit_shapes_both_resolve() {
        let nested = json!({"dataForRoots": [{"commitData": [{"timestamp": 1.0}]}]});
        let flat = json!({"commitData": [{"timestamp": 1.0}]});
        assert_eq!(raw_commits(&nested).len(), 1);
        assert_eq!(raw_commits(&flat).len(), 1);
    }
}
