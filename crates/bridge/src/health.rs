// SPDX-License-Identifier: MIT

//! Connection Health Tracker (spec §4.6): a small ring of recent connect/
//! disconnect events with reconnect coalescing.

use std::collections::VecDeque;

const RING_CAPACITY: usize = 8;
const DEFAULT_RECONNECT_WINDOW_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEventKind {
    Connected,
    Disconnected,
    Reconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionEvent {
    pub kind: ConnectionEventKind,
    pub timestamp_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ConnectionHealthTracker {
    live_connections: u32,
    has_ever_connected: bool,
    last_disconnect_at_ms: Option<u64>,
    recent_events: VecDeque<ConnectionEvent>,
    reconnect_window_ms: u64,
}

impl Default for ConnectionHealthTracker {
    fn default() -> Self {
        Self::with_reconnect_window(DEFAULT_RECONNECT_WINDOW_MS)
    }
}

impl ConnectionHealthTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the reconnect-coalescing window (spec §4.6, `RDT_RECONNECT_WINDOW_MS`).
    pub fn with_reconnect_window(reconnect_window_ms: u64) -> Self {
        Self {
            live_connections: 0,
            has_ever_connected: false,
            last_disconnect_at_ms: None,
            recent_events: VecDeque::new(),
            reconnect_window_ms,
        }
    }

    /// Push `Connected`; rewrites the previous `Disconnected` to
    /// `Reconnected` if it happened within the reconnect window.
    pub fn on_connect(&mut self, now_ms: u64) {
        self.live_connections += 1;
        self.has_ever_connected = true;

        let coalesce = matches!(
            self.recent_events.back(),
            Some(ConnectionEvent { kind: ConnectionEventKind::Disconnected, timestamp_ms })
                if now_ms.saturating_sub(*timestamp_ms) <= self.reconnect_window_ms
        );
        if coalesce {
            if let Some(last) = self.recent_events.back_mut() {
                last.kind = ConnectionEventKind::Reconnected;
            }
        } else {
            self.push(ConnectionEvent { kind: ConnectionEventKind::Connected, timestamp_ms: now_ms });
        }
    }

    pub fn on_disconnect(&mut self, now_ms: u64) {
        self.live_connections = self.live_connections.saturating_sub(1);
        self.last_disconnect_at_ms = Some(now_ms);
        self.push(ConnectionEvent { kind: ConnectionEventKind::Disconnected, timestamp_ms: now_ms });
    }

    fn push(&mut self, event: ConnectionEvent) {
        if self.recent_events.len() == RING_CAPACITY {
            self.recent_events.pop_front();
        }
        self.recent_events.push_back(event);
    }

    pub fn live_connections(&self) -> u32 {
        self.live_connections
    }

    pub fn has_ever_connected(&self) -> bool {
        self.has_ever_connected
    }

    pub fn last_disconnect_at_ms(&self) -> Option<u64> {
        self.last_disconnect_at_ms
    }

    pub fn recent_events(&self) -> impl Iterator<Item = &ConnectionEvent> {
        self.recent_events.iter()
    }

    /// True when the tree is empty and a recent disconnect should explain
    /// why (spec §4.8's `get-tree` hint).
    pub fn recent_disconnect_hint(&self, now_ms: u64) -> Option<u64> {
        self.last_disconnect_at_ms.filter(|&at| {
            self.recent_events
                .back()
                .is_some_and(|e| e.kind == ConnectionEventKind::Disconnected && e.timestamp_ms == at)
        })
        .map(|at| now_ms.saturating_sub(at))
    }
}
