// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};

use crate::element_kind::ElementKind;

/// Node id assigned by the runtime; unique within a renderer.
pub type NodeId = u32;

/// Identifies the renderer (runtime plugin) that owns a node.
pub type RendererId = u32;

/// A single component tree node.
///
/// `child_ids` order is observable: it is whatever the runtime sent most
/// recently, via insertion order or the last `REORDER_CHILDREN`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub display_name: String,
    pub kind: ElementKind,
    pub key: Option<String>,
    /// `None` iff this node is a root.
    pub parent_id: Option<NodeId>,
    pub child_ids: Vec<NodeId>,
    pub renderer_id: RendererId,
}

impl Node {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}
