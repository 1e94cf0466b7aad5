//! In-memory host tree
//!
//! Arena-backed implementation of [`Document`] used by the CLI driver and
//! the tests. Node ids are never reused, so a removed node stays absent.

use std::collections::BTreeMap;

use super::markup::{self, MarkupError};
use super::{Document, NodeId};

#[derive(Debug, Clone)]
struct NodeData {
    tag: String,
    attributes: Vec<(String, String)>,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl NodeData {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attributes: Vec::new(),
            text: String::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryTree {
    nodes: Vec<Option<NodeData>>,
    root: NodeId,
    stylesheets: BTreeMap<String, String>,
    subscribed: bool,
    pending: usize,
    /// Every mutation of an attached node, observed or not
    mutations: u64,
}

impl MemoryTree {
    /// Build a tree from a markup document; the outermost element is the root
    pub fn from_markup(source: &str) -> Result<Self, MarkupError> {
        let parsed = markup::parse(source)?;
        let mut tree = Self::default();
        tree.root = markup::instantiate(&mut tree, &parsed);
        Ok(tree)
    }

    /// Total mutations applied to attached nodes, including unobserved ones
    pub fn mutation_count(&self) -> u64 {
        self.mutations
    }

    /// Number of nodes currently attached below the root
    pub fn attached_count(&self) -> usize {
        fn count(tree: &MemoryTree, node: NodeId) -> usize {
            1 + tree
                .get(node)
                .map(|n| n.children.iter().map(|c| count(tree, *c)).sum::<usize>())
                .unwrap_or(0)
        }
        count(self, self.root)
    }

    fn get(&self, node: NodeId) -> Option<&NodeData> {
        self.nodes.get(node.0 as usize).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, node: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(node.0 as usize).and_then(Option::as_mut)
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(data));
        id
    }

    /// Record a mutation if it touched the attached tree
    fn record(&mut self, attached: bool) {
        if !attached {
            return;
        }
        self.mutations += 1;
        if self.subscribed {
            self.pending += 1;
        }
    }

    fn detach(&mut self, node: NodeId) -> bool {
        let Some(parent) = self.get(node).and_then(|n| n.parent) else {
            return false;
        };
        let attached = self.contains(parent);
        if let Some(p) = self.get_mut(parent) {
            p.children.retain(|c| *c != node);
        }
        if let Some(n) = self.get_mut(node) {
            n.parent = None;
        }
        attached
    }

    /// True if `ancestor` is `node` or one of its ancestors
    fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.get(n).and_then(|d| d.parent);
        }
        false
    }

    fn drop_subtree(&mut self, node: NodeId) {
        let children = self.get(node).map(|n| n.children.clone()).unwrap_or_default();
        for child in children {
            self.drop_subtree(child);
        }
        if let Some(slot) = self.nodes.get_mut(node.0 as usize) {
            *slot = None;
        }
    }

    fn clone_subtree(&mut self, node: NodeId) -> Option<NodeId> {
        let data = self.get(node)?.clone();
        let children = data.children.clone();
        let copy = self.alloc(NodeData {
            parent: None,
            children: Vec::new(),
            ..data
        });
        for child in children {
            if let Some(child_copy) = self.clone_subtree(child) {
                if let Some(c) = self.get_mut(child_copy) {
                    c.parent = Some(copy);
                }
                if let Some(p) = self.get_mut(copy) {
                    p.children.push(child_copy);
                }
            }
        }
        Some(copy)
    }
}

impl Document for MemoryTree {
    fn root(&self) -> NodeId {
        self.root
    }

    fn contains(&self, node: NodeId) -> bool {
        let mut current = node;
        loop {
            if current == self.root {
                return self.get(current).is_some();
            }
            match self.get(current).and_then(|n| n.parent) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    fn tag(&self, node: NodeId) -> Option<&str> {
        self.get(node).map(|n| n.tag.as_str())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.get(node).and_then(|n| n.parent)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.get(node).map(|n| n.children.clone()).unwrap_or_default()
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.get(node)?
            .attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn attributes(&self, node: NodeId) -> Vec<(String, String)> {
        self.get(node).map(|n| n.attributes.clone()).unwrap_or_default()
    }

    fn text(&self, node: NodeId) -> String {
        let Some(data) = self.get(node) else {
            return String::new();
        };
        let mut text = data.text.clone();
        for child in &data.children {
            text.push_str(&self.text(*child));
        }
        text
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        let attached = self.contains(node);
        let Some(data) = self.get_mut(node) else {
            return;
        };
        match data.attributes.iter_mut().find(|(k, _)| k == name) {
            Some((_, existing)) if existing.as_str() == value => return,
            Some((_, existing)) => *existing = value.to_string(),
            None => data.attributes.push((name.to_string(), value.to_string())),
        }
        self.record(attached);
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        let attached = self.contains(node);
        let Some(data) = self.get_mut(node) else {
            return;
        };
        let before = data.attributes.len();
        data.attributes.retain(|(k, _)| k != name);
        if data.attributes.len() != before {
            self.record(attached);
        }
    }

    fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeData::new(tag))
    }

    fn set_own_text(&mut self, node: NodeId, text: &str) {
        let attached = self.contains(node);
        let Some(data) = self.get_mut(node) else {
            return;
        };
        if data.text == text {
            return;
        }
        data.text = text.to_string();
        self.record(attached);
    }

    fn deep_clone(&mut self, node: NodeId) -> Option<NodeId> {
        self.clone_subtree(node)
    }

    fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        if self.get(parent).is_none() || self.get(child).is_none() || self.is_ancestor(child, parent) {
            return;
        }
        let was_attached = self.detach(child);
        self.record(was_attached);

        let attached = self.contains(parent);
        if let Some(p) = self.get_mut(parent) {
            let position = reference
                .and_then(|r| p.children.iter().position(|c| *c == r))
                .unwrap_or(p.children.len());
            p.children.insert(position, child);
        }
        if let Some(c) = self.get_mut(child) {
            c.parent = Some(parent);
        }
        self.record(attached);
    }

    fn remove(&mut self, node: NodeId) {
        if node == self.root {
            return;
        }
        let was_attached = self.detach(node);
        self.drop_subtree(node);
        self.record(was_attached);
    }

    fn set_stylesheet(&mut self, slot: &str, css: &str) {
        if css.is_empty() {
            self.stylesheets.remove(slot);
        } else {
            self.stylesheets.insert(slot.to_string(), css.to_string());
        }
    }

    fn stylesheet(&self, slot: &str) -> Option<&str> {
        self.stylesheets.get(slot).map(String::as_str)
    }

    fn subscribe(&mut self) {
        self.subscribed = true;
    }

    fn unsubscribe(&mut self) {
        self.subscribed = false;
    }

    fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    fn take_notifications(&mut self) -> usize {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Selector;

    fn tree() -> MemoryTree {
        MemoryTree::from_markup(
            r#"<header id="masthead"><div id="start"><a id="logo">Home</a></div><div id="end"><button id="avatar"/></div></header>"#,
        )
        .unwrap()
    }

    fn find(tree: &MemoryTree, selector: &str) -> NodeId {
        tree.query(&Selector::parse(selector).unwrap()).unwrap()
    }

    #[test]
    fn test_notifications_only_while_subscribed() {
        let mut tree = tree();
        let logo = find(&tree, "#logo");

        tree.set_attribute(logo, "title", "x");
        assert_eq!(tree.take_notifications(), 0);

        tree.subscribe();
        tree.set_attribute(logo, "title", "y");
        tree.set_own_text(logo, "Start");
        assert_eq!(tree.take_notifications(), 2);
        assert_eq!(tree.take_notifications(), 0);
        assert_eq!(tree.mutation_count(), 3);
    }

    #[test]
    fn test_identical_writes_are_not_mutations() {
        let mut tree = tree();
        tree.subscribe();
        let logo = find(&tree, "#logo");
        tree.set_attribute(logo, "id", "logo");
        tree.set_own_text(logo, "Home");
        tree.remove_attribute(logo, "missing");
        assert_eq!(tree.take_notifications(), 0);
    }

    #[test]
    fn test_detached_edits_are_invisible() {
        let mut tree = tree();
        tree.subscribe();
        let span = tree.create_element("span");
        tree.set_attribute(span, "class", "x");
        tree.set_own_text(span, "hello");
        assert_eq!(tree.take_notifications(), 0);

        let start = find(&tree, "#start");
        tree.insert_before(start, span, None);
        assert_eq!(tree.take_notifications(), 1);
        assert!(tree.contains(span));
    }

    #[test]
    fn test_deep_clone_is_detached_copy() {
        let mut tree = tree();
        let start = find(&tree, "#start");
        let copy = tree.deep_clone(start).unwrap();
        assert!(!tree.contains(copy));
        assert_eq!(tree.text(copy), "Home");
        assert_eq!(tree.children(copy).len(), 1);
        assert_ne!(tree.children(copy)[0], tree.children(start)[0]);
    }

    #[test]
    fn test_insert_before_reference() {
        let mut tree = tree();
        let root = tree.root();
        let end = find(&tree, "#end");
        let start = find(&tree, "#start");

        tree.insert_before(root, end, Some(start));
        assert_eq!(tree.children(root), vec![end, start]);
    }

    #[test]
    fn test_remove_drops_subtree() {
        let mut tree = tree();
        let start = find(&tree, "#start");
        let logo = find(&tree, "#logo");
        let before = tree.attached_count();

        tree.remove(start);
        assert!(!tree.contains(start));
        assert!(!tree.contains(logo));
        assert_eq!(tree.attached_count(), before - 2);

        // Root cannot be removed
        let root = tree.root();
        tree.remove(root);
        assert!(tree.contains(root));
    }

    #[test]
    fn test_stylesheet_slot_never_notifies() {
        let mut tree = tree();
        tree.subscribe();
        tree.set_stylesheet("s", "a { color: red !important; }");
        assert_eq!(tree.take_notifications(), 0);
        assert!(tree.stylesheet("s").is_some());
        tree.set_stylesheet("s", "");
        assert!(tree.stylesheet("s").is_none());
    }

    #[test]
    fn test_class_helpers() {
        let mut tree = tree();
        let logo = find(&tree, "#logo");
        tree.add_class(logo, "a");
        tree.add_class(logo, "b");
        tree.add_class(logo, "a");
        assert_eq!(tree.attribute(logo, "class"), Some("a b"));
        tree.remove_class(logo, "a");
        assert_eq!(tree.attribute(logo, "class"), Some("b"));
        tree.remove_class(logo, "b");
        assert_eq!(tree.attribute(logo, "class"), None);
    }
}
