//! Node locator
//!
//! Resolves logical element names to live nodes through a primary/fallback
//! selector pair. Resolved nodes are tagged with a stable identifier so the
//! next lookup for the same name is a single attribute match, and the handle
//! is cached for the rest of the pass.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace};

use crate::constants::attrs;
use crate::dom::{Document, NodeId, Selector};
use crate::error::EngineError;

/// Built-in locator table: (name, primary, fallback)
pub const DEFAULT_TABLE: &[(&str, &str, Option<&str>)] = &[
    ("masthead", "header#masthead", Some("#masthead-container > header")),
    ("start", "header #start", Some("header [slot=\"start\"]")),
    ("center", "header #center", Some("header [slot=\"center\"]")),
    ("end", "header #end", Some("header #buttons")),
    ("logo", "#start a#logo", Some("header a[title=\"Home\"]")),
    ("search", "#center form#search", Some("header [role=\"search\"]")),
    ("voice_search", "#center button#voice-search", Some("header [aria-label=\"Search with your voice\"]")),
    ("create", "#end button#create", Some("header [aria-label=\"Create\"]")),
    ("notifications", "#end button#notifications", Some("header [aria-label=\"Notifications\"]")),
    ("avatar", "#end button#avatar", Some("header img.avatar")),
    ("apps", "#end button#apps", None),
    ("guide", "nav#guide", Some("#guide-wrapper nav")),
    ("chips", "#chips-bar", Some("[role=\"tablist\"].chips")),
    ("subscribe", "#owner button#subscribe", Some("button.subscribe")),
    ("title", "#above-the-fold h1#title", Some("h1.title")),
];

#[derive(Debug, Clone)]
pub struct LocatorEntry {
    pub primary: Selector,
    pub fallback: Option<Selector>,
}

impl LocatorEntry {
    fn describe(&self) -> String {
        match &self.fallback {
            Some(fallback) => format!("'{}' then '{}'", self.primary, fallback),
            None => format!("'{}'", self.primary),
        }
    }
}

/// A resolved node, returned to callers instead of re-querying
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeHandle {
    pub name: String,
    pub node: NodeId,
    /// Selector addressing this node in stylesheet rules
    pub selector: String,
    /// The node is an engine clone standing in for the original
    pub is_clone: bool,
}

#[derive(Debug, Clone, Default)]
pub struct NodeLocator {
    table: HashMap<String, LocatorEntry>,
    /// Entries added after startup (tooltip associations)
    dynamic: HashSet<String>,
    /// Logical names currently served by an engine clone
    aliases: HashMap<String, Selector>,
    cache: HashMap<String, NodeHandle>,
}

impl NodeLocator {
    pub fn from_table(entries: &[(&str, &str, Option<&str>)]) -> Result<Self, EngineError> {
        let mut table = HashMap::new();
        for (name, primary, fallback) in entries {
            let entry = LocatorEntry {
                primary: Selector::parse(primary)?,
                fallback: fallback.map(Selector::parse).transpose()?,
            };
            table.insert(name.to_string(), entry);
        }
        Ok(Self {
            table,
            ..Self::default()
        })
    }

    pub fn with_default_table() -> Result<Self, EngineError> {
        Self::from_table(DEFAULT_TABLE)
    }

    /// Selector matching a node tagged for `name`
    pub fn handle_selector(name: &str) -> Selector {
        Selector::attribute(attrs::HANDLE, name)
    }

    /// Forget cached handles; called at the start of every pass
    pub fn begin_pass(&mut self) {
        self.cache.clear();
    }

    /// Drop everything learned at runtime (refresh)
    pub fn reset(&mut self) {
        self.cache.clear();
        self.aliases.clear();
        for name in self.dynamic.drain() {
            self.table.remove(&name);
        }
    }

    #[cfg(test)]
    pub fn has_entry(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    /// Route `name` to an engine clone until the clone disappears
    pub fn alias(&mut self, name: &str, selector: Selector) {
        self.cache.remove(name);
        self.aliases.insert(name.to_string(), selector);
    }

    #[cfg(test)]
    pub fn alias_of(&self, name: &str) -> Option<&Selector> {
        self.aliases.get(name)
    }

    pub fn locate(&mut self, tree: &mut dyn Document, name: &str) -> Result<NodeHandle, EngineError> {
        if let Some(handle) = self.cache.get(name)
            && tree.contains(handle.node)
        {
            return Ok(handle.clone());
        }

        if let Some(alias) = self.aliases.get(name) {
            if let Some(node) = tree.query(alias) {
                let handle = NodeHandle {
                    name: name.to_string(),
                    node,
                    selector: alias.to_string(),
                    is_clone: true,
                };
                self.cache.insert(name.to_string(), handle.clone());
                return Ok(handle);
            }
            debug!(name = %name, alias = %alias, "Clone standing in for element vanished, resolving original");
            self.aliases.remove(name);
        }

        let handle = self.locate_original(tree, name)?;
        self.cache.insert(name.to_string(), handle.clone());
        Ok(handle)
    }

    /// Resolve the host-owned node for `name`, ignoring aliases and clones
    pub fn locate_original(&mut self, tree: &mut dyn Document, name: &str) -> Result<NodeHandle, EngineError> {
        let entry = self
            .table
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::absent(name, "no locator entry"))?;

        let tagged = Self::handle_selector(name);
        let view: &dyn Document = &*tree;
        let node = first_original(view, &tagged)
            .or_else(|| first_original(view, &entry.primary))
            .or_else(|| {
                let fallback = entry.fallback.as_ref()?;
                let node = first_original(view, fallback)?;
                debug!(name = %name, fallback = %fallback, "Primary selector missed, using fallback");
                Some(node)
            })
            .ok_or_else(|| EngineError::absent(name, entry.describe()))?;

        tree.set_attribute(node, attrs::HANDLE, name);
        trace!(name = %name, node = %node, "Located element");
        Ok(NodeHandle {
            name: name.to_string(),
            node,
            selector: tagged.to_string(),
            is_clone: false,
        })
    }

    /// Register a dynamic entry for the first node under `scope` whose host
    /// text equals `text`. Returns false when nothing matches yet.
    pub fn discover_by_text(&mut self, tree: &mut dyn Document, name: &str, scope: &Selector, text: &str) -> bool {
        if self.dynamic.contains(name) && self.locate(tree, name).is_ok() {
            return true;
        }
        let Some(node) = tree
            .query_all(scope)
            .into_iter()
            .find(|n| !tree.is_created(*n) && tree.host_text(*n).trim() == text)
        else {
            return false;
        };

        tree.set_attribute(node, attrs::HANDLE, name);
        self.table.insert(
            name.to_string(),
            LocatorEntry {
                primary: Self::handle_selector(name),
                fallback: None,
            },
        );
        self.dynamic.insert(name.to_string());
        debug!(name = %name, text = %text, node = %node, "Discovered element by text");
        true
    }
}

fn first_original(tree: &dyn Document, selector: &Selector) -> Option<NodeId> {
    tree.query_all(selector).into_iter().find(|n| !tree.is_created(*n))
}
