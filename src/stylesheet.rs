//! Style sheet accumulator
//!
//! One long-lived rule registry rendered into a single document-level style
//! slot. Rules are appended during a pass and only ever dropped all at once.
//!
//! Rules address either a raw selector or a logical target (a region or
//! handle name). Logical targets are bound to a concrete selector, so
//! pointing every rule of a region at a clone is one map update.

use std::collections::HashMap;

use tracing::trace;

use crate::constants::ids;
use crate::dom::Document;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// Concrete selector, never retargeted
    Raw(String),
    /// Logical name resolved through the binding table at render time
    Logical(String),
}

impl Target {
    pub fn raw(selector: impl Into<String>) -> Self {
        Target::Raw(selector.into())
    }

    pub fn logical(name: impl Into<String>) -> Self {
        Target::Logical(name.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRule {
    pub target: Target,
    /// Appended to the resolved selector (`:hover`, ` > .badge`)
    pub suffix: String,
    pub declarations: Vec<(String, String)>,
}

#[derive(Debug, Default)]
pub struct StyleSheet {
    rules: Vec<StyleRule>,
    bindings: HashMap<String, String>,
    dirty: bool,
}

impl StyleSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a logical target unless it is already bound (a retarget wins)
    pub fn bind(&mut self, logical: &str, selector: &str) {
        if !self.bindings.contains_key(logical) {
            self.bindings.insert(logical.to_string(), selector.to_string());
            self.dirty = true;
        }
    }

    /// Point every rule of `logical` at `selector`
    pub fn retarget(&mut self, logical: &str, selector: &str) {
        if self.bindings.get(logical).map(String::as_str) != Some(selector) {
            trace!(target_name = %logical, selector = %selector, "Retargeting rules");
            self.bindings.insert(logical.to_string(), selector.to_string());
            self.dirty = true;
        }
    }

    pub fn binding(&self, logical: &str) -> Option<&str> {
        self.bindings.get(logical).map(String::as_str)
    }

    /// Append a rule. Identical rules are kept once; returns true if added.
    pub fn append_rule(&mut self, target: Target, suffix: &str, declarations: &[(&str, &str)]) -> bool {
        let rule = StyleRule {
            target,
            suffix: suffix.to_string(),
            declarations: declarations
                .iter()
                .map(|(p, v)| (p.to_string(), v.to_string()))
                .collect(),
        };
        if self.rules.contains(&rule) {
            return false;
        }
        self.rules.push(rule);
        self.dirty = true;
        true
    }

    /// Hide whatever `selector` matches
    pub fn hide(&mut self, selector: &str) -> bool {
        self.append_rule(Target::raw(selector), "", &[("display", "none")])
    }

    #[cfg(test)]
    pub fn hides(&self, selector: &str) -> bool {
        self.rules.iter().any(|rule| {
            rule.suffix.is_empty()
                && self.resolve(&rule.target) == Some(selector)
                && rule.declarations.iter().any(|(p, v)| p == "display" && v == "none")
        })
    }

    #[cfg(test)]
    pub fn rules(&self) -> &[StyleRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Drop all rules and bindings. The next flush empties the slot.
    pub fn clear(&mut self) {
        self.rules.clear();
        self.bindings.clear();
        self.dirty = true;
    }

    fn resolve<'a>(&'a self, target: &'a Target) -> Option<&'a str> {
        match target {
            Target::Raw(selector) => Some(selector),
            Target::Logical(name) => self.binding(name),
        }
    }

    pub fn render(&self) -> String {
        let mut css = String::new();
        for rule in &self.rules {
            let Some(selector) = self.resolve(&rule.target) else {
                continue;
            };
            css.push_str(selector);
            css.push_str(&rule.suffix);
            css.push_str(" {");
            for (property, value) in &rule.declarations {
                let value = value.trim_end_matches("!important").trim_end();
                css.push_str(&format!(" {property}: {value} !important;"));
            }
            css.push_str(" }\n");
        }
        css
    }

    /// Write the rendered sheet into the document style slot if it changed.
    /// Style-slot writes are not tree mutations and need no guard.
    pub fn flush(&mut self, tree: &mut dyn Document) {
        if !self.dirty {
            return;
        }
        tree.set_stylesheet(ids::STYLE_SLOT, &self.render());
        self.dirty = false;
    }
}
