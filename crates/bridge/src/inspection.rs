// SPDX-License-Identifier: MIT

//! Pending-inspection resolver map (spec §4.4's `inspectElement` round-trip).
//!
//! The deadline itself is enforced by the caller racing the returned
//! receiver against a timer (spec §5's suspension points); this registry
//! only tracks which request ids are outstanding so a matching
//! `inspectedElement` reply — or a late timeout cleanup — can find them.

use std::collections::HashMap;

use rdt_core::{InspectedElement, NodeId};
use tokio::sync::oneshot;

#[derive(Debug, Default)]
pub struct InspectionRegistry {
    pending: HashMap<NodeId, oneshot::Sender<Option<InspectedElement>>>,
}

impl InspectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A duplicate registration for the same id replaces (and drops) the
    /// prior resolver, per spec §4.4.
    pub fn register(&mut self, id: NodeId, resolver: oneshot::Sender<Option<InspectedElement>>) {
        self.pending.insert(id, resolver);
    }

    /// Resolves a pending inspection; `false` if none was outstanding.
    pub fn resolve(&mut self, id: NodeId, value: Option<InspectedElement>) -> bool {
        match self.pending.remove(&id) {
            Some(tx) => {
                let _ = tx.send(value);
                true
            }
            None => false,
        }
    }

    /// Drops a pending resolver without sending — used when the caller's
    /// own timeout already fired and resolved the receiver with `None`.
    pub fn cancel(&mut self, id: NodeId) {
        self.pending.remove(&id);
    }

    pub fn is_pending(&self, id: NodeId) -> bool {
        self.pending.contains_key(&id)
    }
}
