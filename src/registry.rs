//! Created-node registry
//!
//! Ordered record of every node the engine inserted. Teardown removes them
//! in reverse insertion order; host-owned nodes are never removed. Attribute
//! rewrites on host nodes are recorded with their original value and
//! restored on teardown.

use tracing::debug;

use crate::dom::{Document, NodeId};

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttributeEdit {
    node: NodeId,
    name: String,
    original: Option<String>,
}

#[derive(Debug, Default)]
pub struct CreatedNodes {
    nodes: Vec<NodeId>,
    edits: Vec<AttributeEdit>,
}

impl CreatedNodes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, node: NodeId) {
        if !self.nodes.contains(&node) {
            self.nodes.push(node);
        }
    }

    /// Forget a node the engine removed itself
    pub fn unregister(&mut self, node: NodeId) {
        self.nodes.retain(|n| *n != node);
    }

    #[cfg(test)]
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().copied()
    }

    /// Remember the host value of an attribute before its first rewrite
    pub fn record_attribute(&mut self, node: NodeId, name: &str, original: Option<&str>) {
        if self.edits.iter().any(|e| e.node == node && e.name == name) {
            return;
        }
        self.edits.push(AttributeEdit {
            node,
            name: name.to_string(),
            original: original.map(str::to_string),
        });
    }

    pub fn edited_attributes(&self) -> usize {
        self.edits.len()
    }

    /// Remove every registered node still in the tree, restore rewritten
    /// attributes and empty the registry. Returns how many nodes were removed.
    pub fn teardown(&mut self, tree: &mut dyn Document) -> usize {
        for edit in self.edits.drain(..).rev() {
            if !tree.contains(edit.node) {
                continue;
            }
            match &edit.original {
                Some(value) => tree.set_attribute(edit.node, &edit.name, value),
                None => tree.remove_attribute(edit.node, &edit.name),
            }
        }

        let mut removed = 0;
        for node in self.nodes.drain(..).rev() {
            // The host may already have dropped it (or an ancestor)
            if tree.contains(node) && tree.is_created(node) {
                tree.remove(node);
                removed += 1;
            }
        }
        debug!(removed = removed, "Tore down created nodes");
        removed
    }
}
