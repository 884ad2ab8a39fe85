// SPDX-License-Identifier: MIT

//! `BridgeState`: the orchestrator-owned logic behind the DevTools Wall
//! endpoint (spec §4.4). Pure with respect to I/O — connection tasks (see
//! `connection`) only move bytes; every decision here is synchronous and
//! testable without a real socket.

use std::collections::HashMap;

use rdt_core::{InspectedElement, NodeId};
use rdt_profiler::Profiler;
use rdt_tree::{AddedSummary, ComponentTree};
use rdt_wire::OperationsDecoder;
use serde_json::Value as Json;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;

use crate::connection::ConnectionId;
use crate::dehydration::clean_inspected_element;
use crate::health::ConnectionHealthTracker;
use crate::inspection::InspectionRegistry;
use crate::protocol::{parse_peer_event, OutboundEvent, PeerEvent, HANDSHAKE_SEQUENCE};

struct PeerInfo {
    outbound: mpsc::UnboundedSender<Message>,
    renderer_id: Option<u32>,
    /// Root ids attributed to this connection (spec's `ConnectionRoots`).
    owned_roots: Vec<NodeId>,
    /// Per-connection extended-ADD latch state (spec §4.2, §9).
    decoder: OperationsDecoder,
}

/// Outcome of feeding one inbound text frame through the bridge.
#[derive(Debug, Default)]
pub struct FrameOutcome {
    pub added: Vec<AddedSummary>,
    pub should_close: bool,
}

#[derive(Debug, Default)]
pub struct BridgeState {
    peers: HashMap<ConnectionId, PeerInfo>,
    inspections: InspectionRegistry,
    health: ConnectionHealthTracker,
}

impl BridgeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the connection health tracker's reconnect window (spec §4.6).
    pub fn with_reconnect_window(reconnect_window_ms: u64) -> Self {
        Self { health: ConnectionHealthTracker::with_reconnect_window(reconnect_window_ms), ..Self::default() }
    }

    pub fn health(&self) -> &ConnectionHealthTracker {
        &self.health
    }

    pub fn connected_count(&self) -> usize {
        self.peers.len()
    }

    pub fn on_connected(&mut self, id: ConnectionId, outbound: mpsc::UnboundedSender<Message>, now_ms: u64) {
        self.peers.insert(
            id,
            PeerInfo { outbound, renderer_id: None, owned_roots: Vec::new(), decoder: OperationsDecoder::new() },
        );
        self.health.on_connect(now_ms);
    }

    /// Removes the peer and returns the root ids that must be cleaned from
    /// the tree (spec §4.4's disconnect cleanup).
    pub fn on_disconnected(&mut self, id: ConnectionId, tree: &mut ComponentTree, now_ms: u64) -> Vec<NodeId> {
        let roots = self.peers.remove(&id).map(|p| p.owned_roots).unwrap_or_default();
        for &root in &roots {
            tree.remove_root(root);
        }
        self.health.on_disconnect(now_ms);
        roots
    }

    pub fn handle_frame(
        &mut self,
        id: ConnectionId,
        text: &str,
        tree: &mut ComponentTree,
        profiler: &mut Profiler,
    ) -> FrameOutcome {
        let mut outcome = FrameOutcome::default();
        let Some(event) = parse_peer_event(text) else { return outcome };

        match event {
            PeerEvent::BackendInitialized => {
                for step in HANDSHAKE_SEQUENCE.iter() {
                    self.send_to(id, step.clone());
                }
            }
            PeerEvent::Renderer { payload } => {
                if let Some(peer) = self.peers.get_mut(&id) {
                    if let Some(rid) = payload.get("rendererId").and_then(Json::as_u64) {
                        peer.renderer_id = Some(rid as u32);
                    }
                }
            }
            PeerEvent::Operations { ints } => {
                let Some(peer) = self.peers.get_mut(&id) else { return outcome };
                if let Ok(batch) = peer.decoder.decode_batch(&ints) {
                    if peer.owned_roots.is_empty() {
                        peer.owned_roots.push(batch.root_id);
                    }
                    outcome.added = tree.apply_batch(&batch);
                }
                // Malformed batches are dropped; the connection stays open (spec §7).
            }
            PeerEvent::InspectedElement { payload } => {
                self.handle_inspected_element(payload);
            }
            PeerEvent::ProfilingData { payload } => {
                profiler.process_profiling_payload(&payload);
            }
            PeerEvent::Shutdown => outcome.should_close = true,
            PeerEvent::Accepted | PeerEvent::Ignored => {}
        }

        outcome
    }

    fn handle_inspected_element(&mut self, payload: Json) {
        let Some(ty) = payload.get("type").and_then(Json::as_str) else { return };
        let Some(id) = payload.get("id").and_then(Json::as_u64) else { return };
        let id = id as NodeId;

        let resolved = match ty {
            "full-data" | "hydrated-path" => {
                payload.get("value").map(|value| clean_inspected_element(id, value))
            }
            _ => None,
        };
        self.inspections.resolve(id, resolved);
    }

    /// Looks up `id`; `None` means resolve `null` immediately (node absent,
    /// or no peers connected — spec invariant 15).
    pub fn inspect(&mut self, id: NodeId, tree: &ComponentTree) -> Option<oneshot::Receiver<Option<InspectedElement>>> {
        tree.get_node(id)?;
        if self.peers.is_empty() {
            return None;
        }
        let (tx, rx) = oneshot::channel();
        self.inspections.register(id, tx);
        let renderer_id = self.peers.values().find_map(|p| p.renderer_id).unwrap_or(0);
        self.broadcast(OutboundEvent::InspectElement { id, renderer_id });
        Some(rx)
    }

    /// Drops a pending inspection after the caller's own timeout fired.
    pub fn cancel_inspection(&mut self, id: NodeId) {
        self.inspections.cancel(id);
    }

    pub fn start_profiling(&self) {
        self.broadcast(OutboundEvent::StartProfiling);
    }

    pub fn stop_profiling(&self) {
        self.broadcast(OutboundEvent::StopProfiling);
    }

    fn broadcast(&self, event: OutboundEvent) {
        let message = Message::Text(event.to_envelope().to_text().into());
        for peer in self.peers.values() {
            let _ = peer.outbound.send(message.clone());
        }
    }

    fn send_to(&self, id: ConnectionId, event: OutboundEvent) -> bool {
        match self.peers.get(&id) {
            Some(peer) => peer.outbound.send(Message::Text(event.to_envelope().to_text().into())).is_ok(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn str_entry(s: &str) -> Vec<i64> {
        let mut out = vec![s.chars().count() as i64];
        out.extend(s.chars().map(|c| c as i64));
        out
    }

    fn connect(state: &mut BridgeState, id: ConnectionId, now_ms: u64) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        state.on_connected(id, tx, now_ms);
        rx
    }

    #[test]
    fn backend_initialized_triggers_five_message_handshake() {
        let mut state = BridgeState::new();
        let mut rx = connect(&mut state, 1, 0);
        let mut tree = ComponentTree::new();
        let mut profiler = Profiler::new();

        state.handle_frame(1, r#"{"event":"backendInitialized","payload":null}"#, &mut tree, &mut profiler);

        let mut count = 0;
        while rx.try_recv().is_ok() {
            count += 1;
        }
        assert_eq!(count, 5);
    }

    #[test]
    fn operations_frame_applies_to_tree_and_captures_owned_root() {
        let mut state = BridgeState::new();
        let _rx = connect(&mut state, 1, 0);
        let mut tree = ComponentTree::new();
        let mut profiler = Profiler::new();

        let table = str_entry("App");
        let mut ints = vec![1i64, 100, table.len() as i64];
        ints.extend(table);
        ints.extend(vec![1, 100, 11, 1, 1, 1, 0]);
        let payload = serde_json::to_string(&ints).unwrap();
        let text = format!(r#"{{"event":"operations","payload":{payload}}}"#);

        let outcome = state.handle_frame(1, &text, &mut tree, &mut profiler);
        assert_eq!(outcome.added.len(), 1);
        assert!(tree.get_node(100).is_some());
    }

    #[test]
    fn disconnect_removes_owned_roots_and_records_health_event() {
        let mut state = BridgeState::new();
        let _rx = connect(&mut state, 1, 0);
        let mut tree = ComponentTree::new();
        let mut profiler = Profiler::new();

        let table = str_entry("App");
        let mut ints = vec![1i64, 100, table.len() as i64];
        ints.extend(table);
        ints.extend(vec![1, 100, 11, 1, 1, 1, 0]);
        let payload = serde_json::to_string(&ints).unwrap();
        let text = format!(r#"{{"event":"operations","payload":{payload}}}"#);
        state.handle_frame(1, &text, &mut tree, &mut profiler);

        let removed = state.on_disconnected(1, &mut tree, 1_000);
        assert_eq!(removed, vec![100]);
        assert!(tree.get_node(100).is_none());
        assert_eq!(state.health().live_connections(), 0);
    }

    #[test]
    fn inspect_with_no_peers_resolves_immediately() {
        let mut state = BridgeState::new();
        let mut tree = ComponentTree::new();
        assert!(state.inspect(1, &tree).is_none());

        let table = str_entry("App");
        let mut ints = vec![1i64, 100, table.len() as i64];
        ints.extend(table);
        ints.extend(vec![1, 100, 11, 1, 1, 1, 0]);
        let batch = OperationsDecoder::new().decode_batch(&ints).unwrap();
        tree.apply_batch(&batch);
        assert!(state.inspect(100, &tree).is_none()); // still no peers connected
    }

    #[tokio::test]
    async fn inspected_element_resolves_pending_request() {
        let mut state = BridgeState::new();
        let mut rx = connect(&mut state, 1, 0);
        let mut tree = ComponentTree::new();
        let mut profiler = Profiler::new();

        let table = str_entry("App");
        let mut ints = vec![1i64, 100, table.len() as i64];
        ints.extend(table);
        ints.extend(vec![1, 100, 11, 1, 1, 1, 0]);
        let payload = serde_json::to_string(&ints).unwrap();
        let text = format!(r#"{{"event":"operations","payload":{payload}}}"#);
        state.handle_frame(1, &text, &mut tree, &mut profiler);

        let receiver = state.inspect(100, &tree).expect("peer connected");
        while rx.try_recv().is_ok() {} // drain the broadcast inspectElement frame

        let reply = r#"{"event":"inspectedElement","payload":{"type":"full-data","id":100,"value":{"displayName":"Root","type":11,"key":null,"props":{},"state":null,"hooks":[]}}}"#;
        state.handle_frame(1, reply, &mut tree, &mut profiler);

        let resolved = receiver.await.unwrap();
        assert_eq!(resolved.unwrap().display_name, "Root");
    }
}
