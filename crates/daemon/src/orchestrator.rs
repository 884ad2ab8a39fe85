// SPDX-License-Identifier: MIT

//! The single-writer orchestrator (spec §4.8, §5): the one task that ever
//! mutates `ComponentTree`, `Profiler`, `BridgeState`, or `WaitRegistry`.
//! WebSocket and IPC I/O run on spawned tasks (`rdt_bridge::serve`,
//! `crate::ipc::serve_ipc`) that only move bytes; everything that decides
//! anything funnels through here over channels, mirroring the teacher's
//! `EventBus`/engine-loop split without its WAL durability layer.

use std::time::{Duration, Instant};

use rdt_bridge::{BridgeInbound, BridgeState};
use rdt_core::{Cause, Clock, Hook, InspectedElement, NodeId, SystemClock, Value as RdtValue};
use rdt_profiler::{CommitDetails, Profiler, ProfilerError, Report, TimelineEntry};
use rdt_tree::{ComponentTree, TreeEntry};
use serde_json::{json, Map, Value};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::ipc::IpcInbound;
use crate::protocol::{parse_request, ComponentRef, Request, Response};
use crate::wait::{WaitCondition, WaitRegistry};
use crate::{env, state_file};

/// Messages the orchestrator sends to itself from spawned helper tasks
/// (the 5s inspect deadline, the profiling stop grace window) to keep
/// every mutation on the single owning task.
pub enum Internal {
    CancelInspection(NodeId),
    FinalizeProfileStop { respond: oneshot::Sender<String> },
}

pub struct Orchestrator {
    tree: ComponentTree,
    profiler: Profiler,
    bridge: BridgeState,
    waits: WaitRegistry,
    clock: SystemClock,
    start: Instant,
    port: u16,
    internal_tx: mpsc::Sender<Internal>,
}

impl Orchestrator {
    pub fn new(port: u16, internal_tx: mpsc::Sender<Internal>) -> Self {
        Self {
            tree: ComponentTree::new(),
            profiler: Profiler::new(),
            bridge: BridgeState::with_reconnect_window(env::reconnect_window().as_millis() as u64),
            waits: WaitRegistry::new(),
            clock: SystemClock,
            start: Instant::now(),
            port,
            internal_tx,
        }
    }

    pub async fn run(
        mut self,
        mut bridge_rx: mpsc::Receiver<BridgeInbound>,
        mut ipc_rx: mpsc::Receiver<IpcInbound>,
        mut internal_rx: mpsc::Receiver<Internal>,
        shutdown: CancellationToken,
    ) {
        loop {
            let tick = match self.waits.next_deadline() {
                Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)),
                None => tokio::time::sleep(Duration::from_secs(3600)),
            };
            tokio::pin!(tick);

            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("orchestrator: shutdown requested");
                    break;
                }
                Some(msg) = bridge_rx.recv() => self.handle_bridge_inbound(msg),
                Some(msg) = ipc_rx.recv() => self.handle_ipc_inbound(msg),
                Some(msg) = internal_rx.recv() => self.handle_internal(msg),
                _ = &mut tick => {
                    self.waits.expire(Instant::now());
                }
            }
        }
    }

    fn handle_bridge_inbound(&mut self, msg: BridgeInbound) {
        match msg {
            BridgeInbound::Connected { id, outbound } => {
                self.bridge.on_connected(id, outbound, self.clock.epoch_ms());
                self.waits.signal(&self.tree, self.bridge.health());
            }
            BridgeInbound::Frame { id, text } => {
                let outcome = self.bridge.handle_frame(id, &text, &mut self.tree, &mut self.profiler);
                if !outcome.added.is_empty() {
                    self.waits.signal(&self.tree, self.bridge.health());
                }
                if outcome.should_close {
                    debug!(%id, "bridge: peer requested shutdown");
                }
            }
            BridgeInbound::Disconnected { id } => {
                self.bridge.on_disconnected(id, &mut self.tree, self.clock.epoch_ms());
                self.waits.signal(&self.tree, self.bridge.health());
            }
        }
    }

    fn handle_internal(&mut self, msg: Internal) {
        match msg {
            Internal::CancelInspection(id) => self.bridge.cancel_inspection(id),
            Internal::FinalizeProfileStop { respond } => {
                let now_ms = self.clock.epoch_ms();
                let response = match self.profiler.stop(now_ms, &self.tree) {
                    Ok(summary) => Response::ok(json!({
                        "name": summary.name,
                        "durationMs": summary.duration_ms,
                        "commitCount": summary.commit_count,
                        "perComponentRenderCounts": summary
                            .per_component_render_counts
                            .iter()
                            .map(|(id, name, count)| json!({"id": id, "displayName": name, "renderCount": count}))
                            .collect::<Vec<_>>(),
                    })),
                    Err(ProfilerError::NotReady) => Response::err("No active profiling session"),
                    Err(ProfilerError::NotFound) => Response::err("No active profiling session"),
                };
                let _ = respond.send(response.to_line());
            }
        }
    }

    fn handle_ipc_inbound(&mut self, inbound: IpcInbound) {
        let IpcInbound { line, respond } = inbound;
        let request = match parse_request(&line) {
            Ok(request) => request,
            Err(response) => {
                let _ = respond.send(response.to_line());
                return;
            }
        };

        match request {
            Request::Ping => {
                let _ = respond.send(Response::ok(json!({})).to_line());
            }
            Request::Status => {
                let _ = respond.send(self.status_response().to_line());
            }
            Request::GetTree { depth } => {
                let _ = respond.send(self.get_tree_response(depth).to_line());
            }
            Request::GetComponent { id } => self.handle_get_component(id, respond),
            Request::Find { name, exact } => {
                let entries = self.tree.find_by_name(&name, exact);
                let _ = respond.send(Response::ok(entries_json(&entries)).to_line());
            }
            Request::Count => {
                let _ = respond.send(self.count_response().to_line());
            }
            Request::ProfileStart { name } => {
                let now_ms = self.clock.epoch_ms();
                self.profiler.start(name, now_ms, &self.tree);
                self.bridge.start_profiling();
                let _ = respond.send(Response::ok(json!({})).to_line());
            }
            Request::ProfileStop => self.handle_profile_stop(respond),
            Request::ProfileReport { component_id } => {
                let _ = respond.send(self.profile_report_response(&component_id).to_line());
            }
            Request::ProfileSlow { limit } => {
                let reports = self.profiler.get_slowest(&self.tree, limit.unwrap_or(10));
                let _ = respond.send(Response::ok(reports_json(&reports)).to_line());
            }
            Request::ProfileRerenders { limit } => {
                let reports = self.profiler.get_most_rerenders(&self.tree, limit.unwrap_or(10));
                let _ = respond.send(Response::ok(reports_json(&reports)).to_line());
            }
            Request::ProfileTimeline { limit } => {
                let entries = self.profiler.get_timeline(limit);
                let _ = respond.send(Response::ok(timeline_json(&entries)).to_line());
            }
            Request::ProfileCommit { index, limit } => {
                let _ = respond.send(self.profile_commit_response(index, limit.unwrap_or(10)).to_line());
            }
            Request::Wait { condition, name, timeout } => self.handle_wait(condition, name, timeout, respond),
        }
    }

    fn status_response(&self) -> Response {
        let health = self.bridge.health();
        let recent_events: Vec<Value> = health
            .recent_events()
            .map(|e| json!({"type": connection_event_label(e.kind), "timestamp": e.timestamp_ms}))
            .collect();
        Response::ok(json!({
            "daemonRunning": true,
            "port": self.port,
            "connectedApps": self.bridge.connected_count(),
            "componentCount": self.tree.all_node_ids().len(),
            "profilingActive": self.profiler.is_active(),
            "uptime": self.start.elapsed().as_millis() as u64,
            "connection": {
                "connectedApps": self.bridge.connected_count(),
                "hasEverConnected": health.has_ever_connected(),
                "lastDisconnectAt": health.last_disconnect_at_ms(),
                "recentEvents": recent_events,
            }
        }))
    }

    fn get_tree_response(&mut self, depth: Option<u32>) -> Response {
        let entries = self.tree.get_tree(depth);
        let data = entries_json(&entries);
        if entries.is_empty() {
            let now_ms = self.clock.epoch_ms();
            if let Some(ago_ms) = self.bridge.health().recent_disconnect_hint(now_ms) {
                let hint = format!("app disconnected {} ago, waiting for reconnect...", human_ago(ago_ms));
                return Response::ok_with_hint(data, Some(hint));
            }
        }
        Response::ok(data)
    }

    fn count_response(&self) -> Response {
        let by_kind: Map<String, Value> = self
            .tree
            .get_count_by_kind()
            .iter()
            .map(|(kind, count)| (kind.as_str().to_string(), json!(count)))
            .collect();
        Response::ok(json!({"total": self.tree.all_node_ids().len(), "byKind": by_kind}))
    }

    fn handle_get_component(&mut self, id: ComponentRef, respond: oneshot::Sender<String>) {
        let label = matches!(id, ComponentRef::Label(_)).then(|| id.as_str());
        let display_ref = id.as_str();
        let Some(node_id) = self.tree.resolve_id(&id.as_str()) else {
            let _ = respond.send(Response::err(format!("Component {display_ref} not found")).to_line());
            return;
        };

        let Some(receiver) = self.bridge.inspect(node_id, &self.tree) else {
            let _ = respond.send(Response::err(format!("Component {display_ref} not found")).to_line());
            return;
        };

        let internal_tx = self.internal_tx.clone();
        let timeout = env::inspect_timeout();
        tokio::spawn(async move {
            let resolved = tokio::select! {
                value = receiver => value.unwrap_or(None),
                _ = tokio::time::sleep(timeout) => {
                    let _ = internal_tx.send(Internal::CancelInspection(node_id)).await;
                    None
                }
            };
            let response = match resolved {
                Some(element) => {
                    let data = inspected_element_json(&element);
                    match label {
                        Some(label) => Response::ok_with_label(data, label),
                        None => Response::ok(data),
                    }
                }
                None => Response::err(format!("Component {display_ref} not found")),
            };
            let _ = respond.send(response.to_line());
        });
    }

    fn handle_profile_stop(&mut self, respond: oneshot::Sender<String>) {
        self.bridge.stop_profiling();
        let internal_tx = self.internal_tx.clone();
        let grace = env::profile_stop_grace();
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            let _ = internal_tx.send(Internal::FinalizeProfileStop { respond }).await;
        });
    }

    fn profile_report_response(&self, component_id: &ComponentRef) -> Response {
        let display_ref = component_id.as_str();
        let Some(node_id) = self.tree.resolve_id(&component_id.as_str()) else {
            return Response::err(format!("Component {display_ref} not found"));
        };
        match self.profiler.get_report(node_id, &self.tree) {
            Ok(report) => Response::ok(report_json(&report)),
            Err(ProfilerError::NotReady) => {
                Response::err(format!("Component {display_ref} has not rendered in this session"))
            }
            Err(ProfilerError::NotFound) => Response::err(format!("Component {display_ref} not found")),
        }
    }

    fn profile_commit_response(&self, index: usize, limit: usize) -> Response {
        match self.profiler.get_commit_details(index, &self.tree, limit) {
            Ok(details) => Response::ok(commit_details_json(&details)),
            Err(ProfilerError::NotFound) => Response::err(format!("Commit {index} not found")),
            Err(ProfilerError::NotReady) => Response::err("No active profiling session"),
        }
    }

    fn handle_wait(&mut self, condition: String, name: Option<String>, timeout_ms: Option<u64>, respond: oneshot::Sender<String>) {
        let Some(parsed) = WaitCondition::parse(&condition, name.as_deref()) else {
            let message = if condition == "component" {
                "wait condition \"component\" requires a name".to_string()
            } else {
                format!("Unknown wait condition: {condition}")
            };
            let _ = respond.send(Response::err(message).to_line());
            return;
        };

        let label = parsed.label();
        let deadline = Instant::now() + timeout_ms.map(Duration::from_millis).unwrap_or_else(env::wait_default_timeout);
        let (tx, rx) = oneshot::channel();
        self.waits.register(parsed, deadline, tx, &self.tree, self.bridge.health());

        tokio::spawn(async move {
            if let Ok(outcome) = rx.await {
                let data = if outcome.timeout {
                    json!({"met": outcome.met, "condition": label, "timeout": true})
                } else {
                    json!({"met": outcome.met, "condition": label})
                };
                let _ = respond.send(Response::ok(data).to_line());
            }
        });
    }
}

fn connection_event_label(kind: rdt_bridge::ConnectionEventKind) -> &'static str {
    match kind {
        rdt_bridge::ConnectionEventKind::Connected => "connected",
        rdt_bridge::ConnectionEventKind::Disconnected => "disconnected",
        rdt_bridge::ConnectionEventKind::Reconnected => "reconnected",
    }
}

fn human_ago(ms: u64) -> String {
    let secs = ms / 1000;
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else {
        format!("{}h", secs / 3600)
    }
}

fn entries_json(entries: &[TreeEntry]) -> Value {
    Value::Array(
        entries
            .iter()
            .map(|e| {
                json!({
                    "id": e.id,
                    "label": e.label,
                    "displayName": e.display_name,
                    "kind": e.kind.as_str(),
                    "key": e.key,
                    "parentId": e.parent_id,
                    "childIds": e.child_ids,
                    "depth": e.depth,
                })
            })
            .collect(),
    )
}

fn value_json(value: &RdtValue) -> Value {
    value.to_json()
}

fn hook_json(hook: &Hook) -> Value {
    let mut obj = json!({"name": hook.name, "value": value_json(&hook.value)});
    if let Some(sub) = &hook.sub_hooks {
        obj["subHooks"] = Value::Array(sub.iter().map(hook_json).collect());
    }
    obj
}

fn inspected_element_json(element: &InspectedElement) -> Value {
    let mut props = Map::new();
    for (k, v) in &element.props {
        props.insert(k.clone(), value_json(v));
    }
    let state = element.state.as_ref().map(|entries| {
        let mut map = Map::new();
        for (k, v) in entries {
            map.insert(k.clone(), value_json(v));
        }
        Value::Object(map)
    });
    json!({
        "id": element.id,
        "displayName": element.display_name,
        "kind": element.kind.as_str(),
        "key": element.key,
        "props": Value::Object(props),
        "state": state,
        "hooks": element.hooks.iter().map(hook_json).collect::<Vec<_>>(),
        "renderedAt": element.rendered_at,
    })
}

fn causes_json(causes: &[Cause]) -> Value {
    Value::Array(causes.iter().map(|c| json!(c.as_str())).collect())
}

fn report_json(report: &Report) -> Value {
    json!({
        "id": report.id,
        "displayName": report.display_name,
        "renderCount": report.render_count,
        "totalDuration": report.total_duration,
        "avgDuration": report.avg_duration,
        "maxDuration": report.max_duration,
        "causes": causes_json(&report.causes),
        "changedKeys": report.changed_keys,
    })
}

fn reports_json(reports: &[Report]) -> Value {
    Value::Array(reports.iter().map(report_json).collect())
}

fn timeline_json(entries: &[TimelineEntry]) -> Value {
    Value::Array(
        entries
            .iter()
            .map(|e| json!({"index": e.index, "timestamp": e.timestamp, "duration": e.duration, "componentCount": e.component_count}))
            .collect(),
    )
}

fn commit_details_json(details: &CommitDetails) -> Value {
    json!({
        "index": details.index,
        "totalComponents": details.total_components,
        "rows": details.rows.iter().map(|row| json!({
            "id": row.id,
            "displayName": row.display_name,
            "actualDuration": row.actual_duration,
            "selfDuration": row.self_duration,
            "causes": causes_json(&row.causes),
        })).collect::<Vec<_>>(),
    })
}

/// Resolves a non-fatal bind/socket cleanliness check at startup; kept here
/// rather than `state_file` since it needs no tree/profiler state, only the
/// filesystem — grounded in the teacher's `startup_inner`'s early ordering
/// (lock/staleness check strictly before binding listeners).
pub fn prepare_state_dir(dir: &state_file::StateDir) -> std::io::Result<()> {
    dir.ensure_exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn str_entry(s: &str) -> Vec<i64> {
        let mut out = vec![s.chars().count() as i64];
        out.extend(s.chars().map(|c| c as i64));
        out
    }

    fn root_batch(renderer: i64, root: i64, name: &str) -> rdt_wire::Batch {
        let table = str_entry(name);
        let mut ints = vec![renderer, root, table.len() as i64];
        ints.extend(table);
        ints.extend(vec![1, root, 11, 1, 1, 1, 0]);
        rdt_wire::OperationsDecoder::new().decode_batch(&ints).unwrap()
    }

    #[tokio::test]
    async fn ping_responds_ok() {
        let (internal_tx, _internal_rx) = mpsc::channel(8);
        let mut orchestrator = Orchestrator::new(8097, internal_tx);
        let (respond, rx) = oneshot::channel();
        orchestrator.handle_ipc_inbound(IpcInbound { line: r#"{"type":"ping"}"#.to_string(), respond });
        let line = rx.await.unwrap();
        assert!(line.contains("\"ok\":true"));
    }

    #[tokio::test]
    async fn get_component_with_no_peers_reports_not_found() {
        let (internal_tx, _internal_rx) = mpsc::channel(8);
        let mut orchestrator = Orchestrator::new(8097, internal_tx);
        orchestrator.tree.apply_batch(&root_batch(1, 100, "App"));

        let (respond, rx) = oneshot::channel();
        orchestrator.handle_ipc_inbound(IpcInbound {
            line: r#"{"type":"get-component","id":100}"#.to_string(),
            respond,
        });
        let line = rx.await.unwrap();
        assert!(line.contains("not found"));
    }

    #[tokio::test]
    async fn wait_connected_resolves_once_a_peer_connects() {
        let (internal_tx, _internal_rx) = mpsc::channel(8);
        let mut orchestrator = Orchestrator::new(8097, internal_tx);

        let (respond, rx) = oneshot::channel();
        orchestrator.handle_ipc_inbound(IpcInbound {
            line: r#"{"type":"wait","condition":"connected","timeout":5000}"#.to_string(),
            respond,
        });
        assert_eq!(orchestrator.waits.len(), 1);

        let (tx, _peer_rx) = mpsc::unbounded_channel();
        orchestrator.handle_bridge_inbound(BridgeInbound::Connected { id: 1, outbound: tx });

        let line = rx.await.unwrap();
        assert!(line.contains("\"met\":true"));
    }

    #[test]
    fn human_ago_formats_by_magnitude() {
        assert_eq!(human_ago(2_000), "2s");
        assert_eq!(human_ago(125_000), "2m");
        assert_eq!(human_ago(7_200_000), "2h");
    }
}
