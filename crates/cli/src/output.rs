// SPDX-License-Identifier: MIT

//! Response rendering: `--json` prints the raw envelope, otherwise each
//! command gets a small text formatter for its `data` payload.

use rdt_daemon::Response;
use serde_json::Value;

/// Prints `response` and returns the process exit code.
pub fn print_response(response: &Response, json: bool, text: impl FnOnce(&Value)) -> i32 {
    if json {
        println!("{}", serde_json::to_string_pretty(response).unwrap_or_default());
        return if response.ok { 0 } else { 1 };
    }

    if !response.ok {
        eprintln!("Error: {}", response.error.as_deref().unwrap_or("unknown error"));
        return 1;
    }

    if let Some(hint) = &response.hint {
        println!("({hint})");
    }
    match &response.data {
        Some(data) => text(data),
        None => println!("ok"),
    }
    0
}

pub fn print_tree(data: &Value) {
    let Some(entries) = data.get("entries").and_then(Value::as_array) else {
        println!("{}", serde_json::to_string_pretty(data).unwrap_or_default());
        return;
    };
    for entry in entries {
        let depth = entry.get("depth").and_then(Value::as_u64).unwrap_or(0);
        let id = entry.get("id").and_then(Value::as_u64).unwrap_or_default();
        let name = entry.get("displayName").and_then(Value::as_str).unwrap_or("?");
        let kind = entry.get("kind").and_then(Value::as_str).unwrap_or("?");
        println!("{}#{id} {name} ({kind})", "  ".repeat(depth as usize));
    }
}

pub fn print_status(data: &Value) {
    let running = data.get("daemonRunning").and_then(Value::as_bool).unwrap_or(false);
    println!("daemon running: {running}");
    if let Some(port) = data.get("port").and_then(Value::as_u64) {
        println!("port: {port}");
    }
    if let Some(n) = data.get("connectedApps").and_then(Value::as_u64) {
        println!("connected apps: {n}");
    }
    if let Some(n) = data.get("componentCount").and_then(Value::as_u64) {
        println!("components: {n}");
    }
    if let Some(active) = data.get("profilingActive").and_then(Value::as_bool) {
        println!("profiling: {}", if active { "active" } else { "idle" });
    }
    if let Some(uptime) = data.get("uptime").and_then(Value::as_u64) {
        println!("uptime: {uptime}ms");
    }
}

pub fn print_json(data: &Value) {
    println!("{}", serde_json::to_string_pretty(data).unwrap_or_default());
}
