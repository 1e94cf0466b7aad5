//! Host node tree abstraction
//!
//! The engine never builds the host tree, it only queries and augments it.
//! Everything it needs from the host goes through [`Document`]:
//! - structural reads and writes
//! - a document-level style slot (writes to it never notify)
//! - the coarse "subtree changed" notification feed

pub mod markup;
pub mod memory;
pub mod selector;

pub use memory::MemoryTree;
pub use selector::Selector;

use crate::constants::attrs;

/// Opaque handle to a node owned by the host tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub trait Document {
    // === Structure ===

    fn root(&self) -> NodeId;

    /// True if the node exists and is attached below the root
    fn contains(&self, node: NodeId) -> bool;

    fn tag(&self, node: NodeId) -> Option<&str>;
    fn parent(&self, node: NodeId) -> Option<NodeId>;
    fn children(&self, node: NodeId) -> Vec<NodeId>;
    fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;

    /// All attributes in insertion order
    fn attributes(&self, node: NodeId) -> Vec<(String, String)>;

    /// Own text followed by the text of all descendants
    fn text(&self, node: NodeId) -> String;

    // === Mutation ===

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);
    fn remove_attribute(&mut self, node: NodeId, name: &str);

    /// Create a detached element
    fn create_element(&mut self, tag: &str) -> NodeId;

    fn set_own_text(&mut self, node: NodeId, text: &str);

    /// Copy a node and its subtree; the copy is detached
    fn deep_clone(&mut self, node: NodeId) -> Option<NodeId>;

    /// Insert `child` under `parent` before `reference` (append when `None`).
    /// The child is detached from its previous parent first.
    fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>);

    /// Detach and drop a node with its subtree
    fn remove(&mut self, node: NodeId);

    // === Style slot ===

    fn set_stylesheet(&mut self, slot: &str, css: &str);
    fn stylesheet(&self, slot: &str) -> Option<&str>;

    // === Change feed ===

    fn subscribe(&mut self);
    fn unsubscribe(&mut self);
    fn is_subscribed(&self) -> bool;

    /// Drain queued notifications, returning how many were pending
    fn take_notifications(&mut self) -> usize;

    // === Provided ===

    fn query(&self, selector: &Selector) -> Option<NodeId> {
        selector::query_first(self, self.root(), selector)
    }

    fn query_all(&self, selector: &Selector) -> Vec<NodeId> {
        selector::query_all(self, self.root(), selector)
    }

    fn query_within(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        selector::query_first(self, scope, selector)
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attribute(node, "class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    fn add_class(&mut self, node: NodeId, class: &str) {
        if self.has_class(node, class) {
            return;
        }
        let classes = match self.attribute(node, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {class}", existing.trim()),
            _ => class.to_string(),
        };
        self.set_attribute(node, "class", &classes);
    }

    fn remove_class(&mut self, node: NodeId, class: &str) {
        if !self.has_class(node, class) {
            return;
        }
        let remaining: Vec<String> = self
            .attribute(node, "class")
            .unwrap_or_default()
            .split_whitespace()
            .filter(|c| *c != class)
            .map(str::to_string)
            .collect();
        if remaining.is_empty() {
            self.remove_attribute(node, "class");
        } else {
            self.set_attribute(node, "class", &remaining.join(" "));
        }
    }

    /// Hidden by the host (`hidden` attribute on the node or an ancestor)
    fn is_hidden(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if self.attribute(n, attrs::HIDDEN).is_some() {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// Text held directly by the node, without its children
    fn own_text(&self, node: NodeId) -> String {
        let full = self.text(node);
        let from_children: usize = self.children(node).iter().map(|c| self.text(*c).len()).sum();
        full[..full.len().saturating_sub(from_children)].to_string()
    }

    /// Text as rendered by the host, skipping engine-created descendants
    fn host_text(&self, node: NodeId) -> String {
        let mut text = self.own_text(node);
        for child in self.children(node) {
            if !self.is_created(child) {
                text.push_str(&self.host_text(child));
            }
        }
        text
    }

    /// Engine-created nodes carry the created marker
    fn is_created(&self, node: NodeId) -> bool {
        self.attribute(node, attrs::CREATED).is_some()
    }
}
