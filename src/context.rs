//! Engine context and per-pass access
//!
//! [`EngineContext`] owns everything the reconciliation loop mutates. It is
//! built once at startup and handed around by reference. A [`Pass`] borrows
//! it together with a guarded tree for the duration of one batch of edits.

use std::rc::Rc;

use tracing::{debug, error};

use crate::config::{GlobalSettings, Profile};
use crate::constants::{attrs, failsafe, retry};
use crate::dom::{Document, NodeId};
use crate::error::EngineError;
use crate::guard::GuardedTree;
use crate::locator::{NodeHandle, NodeLocator};
use crate::registry::CreatedNodes;
use crate::scheduler::TaskQueue;
use crate::stylesheet::{StyleSheet, Target};

/// Fail-safe ceilings and retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineLimits {
    pub max_idle_notifications: u32,
    pub max_applied_updates: u32,
    pub retry_delay_ms: u64,
    pub max_retry_attempts: u32,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            max_idle_notifications: failsafe::MAX_IDLE_NOTIFICATIONS,
            max_applied_updates: failsafe::MAX_APPLIED_UPDATES,
            retry_delay_ms: retry::DELAY_MS,
            max_retry_attempts: retry::MAX_ATTEMPTS,
        }
    }
}

impl From<&GlobalSettings> for EngineLimits {
    fn from(global: &GlobalSettings) -> Self {
        Self {
            max_idle_notifications: global.max_idle_notifications,
            max_applied_updates: global.max_applied_updates,
            retry_delay_ms: global.retry_delay_ms,
            max_retry_attempts: global.max_retry_attempts,
        }
    }
}

/// What the last batch did, region by region
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub applied: Vec<String>,
    pub skipped: Vec<(String, EngineError)>,
    /// Regions waiting on a deferred retry
    pub deferred: Vec<String>,
}

impl PassReport {
    pub fn error_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }

    #[cfg(test)]
    pub fn skipped_regions(&self) -> Vec<&str> {
        self.skipped.iter().map(|(region, _)| region.as_str()).collect()
    }
}

#[derive(Debug)]
pub struct EngineContext {
    pub profile: Rc<Profile>,
    pub previous_profile: Option<String>,
    /// Consecutive notifications that changed nothing
    pub idle: u32,
    /// Reapplications since the last refresh
    pub applied: u32,
    /// Full passes since startup or the last refresh
    pub passes: u32,
    pub guide_preloaded: bool,
    pub sheet: StyleSheet,
    pub registry: CreatedNodes,
    pub locator: NodeLocator,
    pub queue: TaskQueue,
    pub limits: EngineLimits,
    pub report: PassReport,
}

impl EngineContext {
    pub fn new(profile: Profile, locator: NodeLocator, limits: EngineLimits) -> Self {
        Self {
            profile: Rc::new(profile),
            previous_profile: None,
            idle: 0,
            applied: 0,
            passes: 0,
            guide_preloaded: false,
            sheet: StyleSheet::new(),
            registry: CreatedNodes::new(),
            locator,
            queue: TaskQueue::new(limits.retry_delay_ms, limits.max_retry_attempts),
            limits,
            report: PassReport::default(),
        }
    }

    pub fn reset_counters(&mut self) {
        self.idle = 0;
        self.applied = 0;
        self.passes = 0;
    }
}

/// One batch of edits against a guarded tree
pub struct Pass<'p> {
    pub tree: &'p mut dyn Document,
    pub ctx: &'p mut EngineContext,
}

impl<'p> Pass<'p> {
    /// Only a guarded tree can back a pass
    pub fn new(guard: &'p mut GuardedTree<'_>, ctx: &'p mut EngineContext) -> Self {
        ctx.locator.begin_pass();
        Self {
            tree: guard.tree(),
            ctx,
        }
    }

    pub fn profile(&self) -> Rc<Profile> {
        Rc::clone(&self.ctx.profile)
    }

    /// Resolve a logical name and bind it as a style target
    pub fn locate(&mut self, name: &str) -> Result<NodeHandle, EngineError> {
        let handle = self.ctx.locator.locate(&mut *self.tree, name)?;
        if handle.is_clone {
            self.ctx.sheet.retarget(name, &handle.selector);
        } else {
            self.ctx.sheet.bind(name, &handle.selector);
        }
        Ok(handle)
    }

    /// Append a rule addressed by logical name
    pub fn rule(&mut self, name: &str, suffix: &str, declarations: &[(&str, &str)]) {
        if declarations.is_empty() {
            return;
        }
        self.ctx.sheet.append_rule(Target::logical(name), suffix, declarations);
    }

    /// Hide a region through the stylesheet
    pub fn hide(&mut self, name: &str) {
        self.rule(name, "", &[("display", "none")]);
    }

    /// Rewrite a host attribute, remembering its original value for teardown
    pub fn set_host_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if self.tree.attribute(node, name) == Some(value) {
            return;
        }
        let original = self.tree.attribute(node, name).map(str::to_string);
        self.ctx.registry.record_attribute(node, name, original.as_deref());
        self.tree.set_attribute(node, name, value);
    }

    /// Create a detached element carrying the created marker
    pub fn create(&mut self, tag: &str) -> NodeId {
        let node = self.tree.create_element(tag);
        self.tree.set_attribute(node, attrs::CREATED, "");
        node
    }

    /// Attach an engine node and register it for teardown
    pub fn insert_created(&mut self, parent: NodeId, node: NodeId, reference: Option<NodeId>) {
        if !self.tree.is_created(node) {
            self.tree.set_attribute(node, attrs::CREATED, "");
        }
        self.tree.insert_before(parent, node, reference);
        self.ctx.registry.register(node);
    }

    /// Drop an engine node the pass no longer wants
    pub fn remove_created(&mut self, node: NodeId) {
        if !self.tree.is_created(node) {
            error!(node = %node, "Refusing to remove a host node");
            return;
        }
        self.tree.remove(node);
        self.ctx.registry.unregister(node);
    }

    /// First engine-created child of `parent` carrying `class`
    pub fn created_child(&self, parent: NodeId, class: &str) -> Option<NodeId> {
        self.tree
            .children(parent)
            .into_iter()
            .find(|c| self.tree.is_created(*c) && self.tree.has_class(*c, class))
    }

    /// Wait for a region that has not rendered yet. Exhausting the retry
    /// budget turns the wait into an absence error.
    pub fn defer(&mut self, name: &str) -> Result<(), EngineError> {
        self.ctx.queue.schedule_retry(name)?;
        debug!(region = %name, attempt = self.ctx.queue.attempts(name), "Waiting for element to render");
        self.ctx.report.deferred.push(name.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{MemoryTree, Selector};
    use crate::guard::guarded;

    fn context() -> EngineContext {
        EngineContext::new(
            Profile::default(),
            NodeLocator::with_default_table().unwrap(),
            EngineLimits::default(),
        )
    }

    fn page() -> MemoryTree {
        MemoryTree::from_markup(
            r#"<body><header id="masthead"><div id="start"><a id="logo" href="/">Home</a></div></header></body>"#,
        )
        .unwrap()
    }

    #[test]
    fn test_locate_binds_style_target() {
        let mut tree = page();
        let mut ctx = context();
        guarded(&mut tree, |g| {
            let mut pass = Pass::new(g, &mut ctx);
            pass.locate("logo").unwrap();
            pass.rule("logo", "", &[("width", "80px")]);
        });
        assert!(ctx.sheet.render().contains("[data-retrofit-id=\"logo\"] { width: 80px !important; }"));
    }

    #[test]
    fn test_created_nodes_are_registered() {
        let mut tree = page();
        let mut ctx = context();
        tree.subscribe();
        let span = guarded(&mut tree, |g| {
            let mut pass = Pass::new(g, &mut ctx);
            let logo = pass.locate("logo").unwrap();
            let span = pass.create("span");
            pass.insert_created(logo.node, span, None);
            span
        });
        assert_eq!(tree.take_notifications(), 0);
        assert!(ctx.registry.contains(span));
        assert!(tree.is_created(span));
    }

    #[test]
    fn test_remove_created_refuses_host_nodes() {
        let mut tree = page();
        let mut ctx = context();
        let logo = tree.query(&Selector::id("logo")).unwrap();
        guarded(&mut tree, |g| {
            let mut pass = Pass::new(g, &mut ctx);
            pass.remove_created(logo);
        });
        assert!(tree.contains(logo));
    }

    #[test]
    fn test_defer_counts_attempts() {
        let mut tree = page();
        let mut ctx = context();
        ctx.queue = TaskQueue::new(10, 1);
        let results = guarded(&mut tree, |g| {
            let mut pass = Pass::new(g, &mut ctx);
            let first = pass.defer("guide");
            pass.ctx.queue.pop_due(u64::MAX);
            (first, pass.defer("guide"))
        });
        assert_eq!(results.0, Ok(()));
        assert!(matches!(results.1, Err(EngineError::RetryExhausted { .. })));
        assert_eq!(ctx.report.deferred, vec!["guide".to_string()]);
    }
}
