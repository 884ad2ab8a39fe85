// SPDX-License-Identifier: MIT

//! The canonical in-memory component tree (spec §4.3).
//!
//! Decoding is the caller's concern: a connection's [`rdt_wire::Batch`] is
//! produced by a per-connection `OperationsDecoder` (the extended-ADD latch
//! is connection-scoped per §4.2's prose, not tree-scoped despite the data
//! model listing it alongside `ComponentTree` — see DESIGN.md). The tree
//! only ever consumes already-decoded batches.

use std::collections::{HashMap, HashSet};

use rdt_core::{ElementKind, Node, NodeId};
use rdt_wire::{Batch, Op};

/// Emitted for every node created by `apply_batch`, used to signal the Wait
/// Registry (spec §4.7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedSummary {
    pub id: NodeId,
    pub display_name: String,
}

/// One row of a `get_tree` / `find_by_name` result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub id: NodeId,
    /// `@cN` label; only populated (non-empty) following a `get_tree` call
    /// that assigned it. `find_by_name` reuses whatever labels the most
    /// recent `get_tree` produced rather than reassigning its own.
    pub label: String,
    pub display_name: String,
    pub kind: ElementKind,
    pub key: Option<String>,
    pub parent_id: Option<NodeId>,
    pub child_ids: Vec<NodeId>,
    pub depth: u32,
}

/// The canonical store: one map of live nodes, an ordered root sequence, a
/// case-insensitive name index, and the label map rebuilt on each
/// `get_tree` call.
#[derive(Debug, Clone, Default)]
pub struct ComponentTree {
    nodes: HashMap<NodeId, Node>,
    roots: Vec<NodeId>,
    name_index: HashMap<String, HashSet<NodeId>>,
    labels: HashMap<String, NodeId>,
    label_by_id: HashMap<NodeId, String>,
}

impl ComponentTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a decoded batch's tree-relevant ops in order, returning a
    /// summary of every node that was added.
    pub fn apply_batch(&mut self, batch: &Batch) -> Vec<AddedSummary> {
        let mut added = Vec::new();
        for op in &batch.ops {
            match op {
                Op::Add { id, kind, parent_id, display_name, key } => {
                    self.add_node(*id, *kind, *parent_id, display_name.clone(), key.clone(), batch.renderer_id);
                    added.push(AddedSummary { id: *id, display_name: display_name.clone() });
                }
                Op::Remove { ids } => {
                    for &id in ids {
                        let parent_id = self.nodes.get(&id).and_then(|n| n.parent_id);
                        self.detach_from_parent(id, parent_id);
                        self.remove_subtree(id);
                    }
                }
                Op::ReorderChildren { parent_id, child_ids } => {
                    if let Some(node) = self.nodes.get_mut(parent_id) {
                        node.child_ids = child_ids.clone();
                    }
                }
                Op::RemoveRoot => self.remove_root(batch.root_id),
            }
        }
        added
    }

    fn add_node(
        &mut self,
        id: NodeId,
        kind: ElementKind,
        parent_id: Option<NodeId>,
        display_name: String,
        key: Option<String>,
        renderer_id: u32,
    ) {
        if let Some(pid) = parent_id {
            if let Some(parent) = self.nodes.get_mut(&pid) {
                parent.child_ids.push(id);
            }
        } else {
            self.roots.push(id);
        }
        self.name_index
            .entry(display_name.to_lowercase())
            .or_default()
            .insert(id);
        self.nodes.insert(
            id,
            Node { id, display_name, kind, key, parent_id, child_ids: Vec::new(), renderer_id },
        );
    }

    fn detach_from_parent(&mut self, id: NodeId, parent_id: Option<NodeId>) {
        if let Some(pid) = parent_id {
            if let Some(parent) = self.nodes.get_mut(&pid) {
                parent.child_ids.retain(|&c| c != id);
            }
        }
    }

    fn remove_subtree(&mut self, id: NodeId) {
        let child_ids = self.nodes.get(&id).map(|n| n.child_ids.clone()).unwrap_or_default();
        for child in child_ids {
            self.remove_subtree(child);
        }
        if let Some(node) = self.nodes.remove(&id) {
            if let Some(set) = self.name_index.get_mut(&node.display_name.to_lowercase()) {
                set.remove(&id);
            }
            self.roots.retain(|&r| r != id);
            self.labels.retain(|_, v| *v != id);
            self.label_by_id.remove(&id);
        }
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn remove_root(&mut self, root_id: NodeId) {
        if !self.nodes.contains_key(&root_id) {
            return;
        }
        self.remove_subtree(root_id);
    }

    pub fn get_tree(&mut self, max_depth: Option<u32>) -> Vec<TreeEntry> {
        self.labels.clear();
        self.label_by_id.clear();
        let mut counter = 0u32;
        let mut out = Vec::new();
        let roots = self.roots.clone();
        for root_id in roots {
            self.walk(root_id, 0, max_depth, &mut counter, &mut out);
        }
        out
    }

    fn walk(&mut self, id: NodeId, depth: u32, max_depth: Option<u32>, counter: &mut u32, out: &mut Vec<TreeEntry>) {
        let Some(node) = self.nodes.get(&id).cloned() else { return };
        *counter += 1;
        let label = format!("@c{counter}");
        self.labels.insert(label.clone(), id);
        self.label_by_id.insert(id, label.clone());
        let child_ids = node.child_ids.clone();
        out.push(TreeEntry {
            id,
            label,
            display_name: node.display_name,
            kind: node.kind,
            key: node.key,
            parent_id: node.parent_id,
            child_ids: child_ids.clone(),
            depth,
        });
        if max_depth.is_some_and(|max| depth >= max) {
            return;
        }
        for child in child_ids {
            self.walk(child, depth + 1, max_depth, counter, out);
        }
    }

    pub fn find_by_name(&self, name: &str, exact: bool) -> Vec<TreeEntry> {
        let needle = name.to_lowercase();
        let mut ids: Vec<NodeId> = if exact {
            self.name_index.get(&needle).into_iter().flatten().copied().collect()
        } else {
            self.name_index
                .iter()
                .filter(|(key, _)| key.contains(&needle))
                .flat_map(|(_, ids)| ids.iter().copied())
                .collect()
        };
        ids.sort_unstable();
        ids.into_iter().filter_map(|id| self.entry_for(id)).collect()
    }

    fn entry_for(&self, id: NodeId) -> Option<TreeEntry> {
        let node = self.nodes.get(&id)?;
        Some(TreeEntry {
            id,
            label: self.label_by_id.get(&id).cloned().unwrap_or_default(),
            display_name: node.display_name.clone(),
            kind: node.kind,
            key: node.key.clone(),
            parent_id: node.parent_id,
            child_ids: node.child_ids.clone(),
            depth: self.depth_of(id),
        })
    }

    fn depth_of(&self, id: NodeId) -> u32 {
        let mut depth = 0;
        let mut current = self.nodes.get(&id).and_then(|n| n.parent_id);
        while let Some(pid) = current {
            depth += 1;
            current = self.nodes.get(&pid).and_then(|n| n.parent_id);
        }
        depth
    }

    pub fn get_count_by_kind(&self) -> HashMap<ElementKind, usize> {
        let mut counts = HashMap::new();
        for node in self.nodes.values() {
            *counts.entry(node.kind).or_insert(0) += 1;
        }
        counts
    }

    pub fn all_node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    /// Accepts a numeric id or an `@cN` label resolved against the most
    /// recent `get_tree` call.
    pub fn resolve_id(&self, reference: &str) -> Option<NodeId> {
        if let Ok(id) = reference.parse::<NodeId>() {
            return Some(id);
        }
        self.labels.get(reference).copied()
    }
}
