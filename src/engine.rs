//! Reconciliation loop
//!
//! The engine reacts to the host's "subtree changed" notifications. The first
//! notification (or any after the success marker went missing) triggers a full
//! pass over every wanted region; once converged, notifications only run the
//! narrow sync path. Two counters guard against runaway loops: consecutive
//! no-op notifications and reapplications since the last refresh. Tripping
//! either halts the engine until a manual refresh.

use std::rc::Rc;

use tracing::{debug, error, info, info_span, trace, warn};

use crate::config::Profile;
use crate::constants::attrs;
use crate::context::{EngineContext, EngineLimits, Pass, PassReport};
use crate::dom::{Document, NodeId, Selector};
use crate::error::EngineError;
use crate::guard::guarded;
use crate::locator::NodeLocator;
use crate::transform::{self, Transformer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Nothing applied yet for the active profile
    Idle,
    /// A batch of edits is in flight
    Reconverging,
    /// Success marker in place, only narrow updates run
    Converged,
    /// A fail-safe tripped; nothing runs until a refresh
    Halted,
}

/// What a notification resulted in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    FullPass,
    NarrowUpdate,
    NoOp,
    Ignored,
    Halted,
}

pub struct Engine {
    ctx: EngineContext,
    state: LoopState,
    transformers: Vec<Box<dyn Transformer>>,
    diagnostics: Vec<EngineError>,
}

impl Engine {
    pub fn new(profile: Profile, limits: EngineLimits) -> Result<Self, EngineError> {
        Ok(Self::with_locator(profile, NodeLocator::with_default_table()?, limits))
    }

    pub fn with_locator(profile: Profile, locator: NodeLocator, limits: EngineLimits) -> Self {
        Self {
            ctx: EngineContext::new(profile, locator, limits),
            state: LoopState::Idle,
            transformers: transform::full_set(),
            diagnostics: Vec::new(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    /// Outcome of the last pass, region by region
    pub fn report(&self) -> &PassReport {
        &self.ctx.report
    }

    /// Fail-safe diagnostics raised this session
    pub fn diagnostics(&self) -> &[EngineError] {
        &self.diagnostics
    }

    pub fn profile(&self) -> &Profile {
        &self.ctx.profile
    }

    /// Subscribe to the host and run the first pass
    pub fn start(&mut self, tree: &mut dyn Document) -> Outcome {
        if self.ctx.profile.is_disabled() {
            info!("Mode is disabled, not subscribing");
            return Outcome::Ignored;
        }
        info!(profile = %self.ctx.profile.name(), "Starting engine");
        tree.subscribe();
        self.on_notification(tree)
    }

    /// React to one "subtree changed" notification
    pub fn on_notification(&mut self, tree: &mut dyn Document) -> Outcome {
        if self.state == LoopState::Halted || self.ctx.profile.is_disabled() {
            return Outcome::Ignored;
        }
        if self.state == LoopState::Idle || !self.marker_present(tree) {
            self.full_pass(tree)
        } else {
            self.narrow(tree)
        }
    }

    /// Deliver every notification the host queued since the last call
    pub fn pump(&mut self, tree: &mut dyn Document) -> Vec<Outcome> {
        let pending = tree.take_notifications();
        let mut outcomes = Vec::with_capacity(pending);
        for _ in 0..pending {
            let outcome = self.on_notification(tree);
            outcomes.push(outcome);
            if self.state == LoopState::Halted {
                break;
            }
        }
        outcomes
    }

    /// Let `ms` of virtual time pass, running retries that fall due.
    /// Returns how many retries ran.
    pub fn advance(&mut self, tree: &mut dyn Document, ms: u64) -> usize {
        let until = self.ctx.queue.now().saturating_add(ms);
        let mut ran = 0;

        while let Some(key) = self.ctx.queue.pop_due(until) {
            if self.state == LoopState::Halted {
                break;
            }
            let Some(transformer) = self.transformers.iter().find(|t| t.region() == key) else {
                warn!(key = %key, "No transformer for retry");
                continue;
            };
            trace!(region = %key, "Running deferred retry");
            self.ctx.report.deferred.retain(|d| *d != key);

            let ctx = &mut self.ctx;
            guarded(tree, |g| {
                let mut pass = Pass::new(g, ctx);
                transform::run(transformer.as_ref(), &mut pass);
            });
            self.ctx.sheet.flush(tree);
            ran += 1;
        }

        self.ctx.queue.settle(until);
        ran
    }

    /// Tear down everything the engine added, then reapply from scratch,
    /// optionally switching to another profile first
    pub fn refresh(&mut self, tree: &mut dyn Document, profile: Option<Profile>) -> Outcome {
        let span = info_span!("refresh", profile = %self.ctx.profile.name());
        let _enter = span.enter();

        self.ctx.queue.cancel_all();

        let current = self.ctx.profile.name();
        let previous = self.ctx.previous_profile.clone();
        let ctx = &mut self.ctx;
        let removed = guarded(tree, |g| {
            let tree = g.tree();
            let removed = ctx.registry.teardown(tree);
            clear_marker(tree, &current);
            if let Some(previous) = &previous {
                clear_marker(tree, previous);
            }
            removed
        });
        self.ctx.sheet.clear();
        self.ctx.sheet.flush(tree);
        debug!(removed, "Teardown complete");

        self.ctx.reset_counters();
        self.ctx.locator.reset();
        self.ctx.guide_preloaded = false;
        self.ctx.report = PassReport::default();

        if let Some(profile) = profile {
            info!(from = %current, to = %profile.name(), "Switching profile");
            self.ctx.previous_profile = Some(current);
            self.ctx.profile = Rc::new(profile);
        }
        self.state = LoopState::Idle;

        if self.ctx.profile.is_disabled() {
            info!("Mode is disabled, unsubscribing");
            tree.unsubscribe();
            return Outcome::Ignored;
        }
        tree.subscribe();
        self.full_pass(tree)
    }

    fn marker_present(&self, tree: &dyn Document) -> bool {
        let marker = Selector::attribute(attrs::SUCCESS_MARKER, &self.ctx.profile.name());
        tree.query(&marker).is_some()
    }

    fn full_pass(&mut self, tree: &mut dyn Document) -> Outcome {
        if self.ctx.passes > 0 {
            self.ctx.applied += 1;
            debug!(applied = self.ctx.applied, "Success marker missing, reapplying");
        }
        if self.ctx.applied > self.ctx.limits.max_applied_updates {
            return self.halt(tree, "applied updates", self.ctx.applied, self.ctx.limits.max_applied_updates);
        }
        self.ctx.passes += 1;
        self.ctx.idle = 0;
        self.state = LoopState::Reconverging;

        let profile = Rc::clone(&self.ctx.profile);
        let span = info_span!("pass", profile = %profile.name(), pass = self.ctx.passes);
        let _enter = span.enter();

        self.ctx.report = PassReport::default();
        let ctx = &mut self.ctx;
        let transformers = &self.transformers;
        guarded(tree, |g| {
            let mut pass = Pass::new(g, ctx);
            for transformer in transformers.iter().filter(|t| t.wanted(&profile)) {
                transform::run(transformer.as_ref(), &mut pass);
            }
            mark_converged(&mut pass);
        });
        self.ctx.sheet.flush(tree);
        self.state = LoopState::Converged;

        let report = &self.ctx.report;
        info!(
            applied = report.applied.len(),
            skipped = report.error_count(),
            deferred = report.deferred.len(),
            "Pass complete"
        );
        Outcome::FullPass
    }

    fn narrow(&mut self, tree: &mut dyn Document) -> Outcome {
        self.state = LoopState::Reconverging;

        let profile = Rc::clone(&self.ctx.profile);
        let ctx = &mut self.ctx;
        let transformers = &self.transformers;
        let changed = guarded(tree, |g| {
            let mut pass = Pass::new(g, ctx);
            let mut changed = false;
            for transformer in transformers.iter().filter(|t| t.wanted(&profile)) {
                changed |= transform::run_sync(transformer.as_ref(), &mut pass);
            }
            changed
        });
        self.ctx.sheet.flush(tree);
        self.state = LoopState::Converged;

        if changed {
            self.ctx.applied += 1;
            self.ctx.idle = 0;
            trace!(applied = self.ctx.applied, "Narrow update");
            if self.ctx.applied > self.ctx.limits.max_applied_updates {
                return self.halt(tree, "applied updates", self.ctx.applied, self.ctx.limits.max_applied_updates);
            }
            Outcome::NarrowUpdate
        } else {
            self.ctx.idle += 1;
            if self.ctx.idle > self.ctx.limits.max_idle_notifications {
                return self.halt(tree, "idle notifications", self.ctx.idle, self.ctx.limits.max_idle_notifications);
            }
            Outcome::NoOp
        }
    }

    fn halt(&mut self, tree: &mut dyn Document, counter: &'static str, value: u32, limit: u32) -> Outcome {
        let err = EngineError::RunawayLoop { counter, value, limit };
        error!(error = %err, "Fail-safe tripped, halting until refresh");
        self.diagnostics.push(err);
        tree.unsubscribe();
        self.ctx.queue.cancel_all();
        self.state = LoopState::Halted;
        Outcome::Halted
    }
}

/// Tag the masthead (or the root when it is missing) with the success marker
/// and the profile class
fn mark_converged(pass: &mut Pass<'_>) {
    let name = pass.ctx.profile.name();
    let node: NodeId = match pass.locate("masthead") {
        Ok(handle) => handle.node,
        Err(_) => pass.tree.root(),
    };
    pass.tree.add_class(node, &format!("{}{name}", attrs::PROFILE_CLASS_PREFIX));
    pass.tree.set_attribute(node, attrs::SUCCESS_MARKER, &name);
    if let Some(previous) = pass.ctx.previous_profile.as_deref()
        && previous != name
    {
        pass.tree.remove_class(node, &format!("{}{previous}", attrs::PROFILE_CLASS_PREFIX));
    }
}

fn clear_marker(tree: &mut dyn Document, profile_name: &str) {
    let class = format!("{}{profile_name}", attrs::PROFILE_CLASS_PREFIX);
    let marked = Selector::attribute(attrs::SUCCESS_MARKER, profile_name);
    for node in tree.query_all(&marked) {
        tree.remove_attribute(node, attrs::SUCCESS_MARKER);
        tree.remove_class(node, &class);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Mode, Theme, defaults};
    use crate::constants::ids;
    use crate::dom::{MemoryTree, markup};
    use std::sync::{Arc, Mutex};
    use tracing::Level;
    use tracing_subscriber::FmtSubscriber;
    use tracing_subscriber::fmt::MakeWriter;

    const PAGE: &str = include_str!("../demos/page.xml");

    fn page() -> MemoryTree {
        MemoryTree::from_markup(PAGE).unwrap()
    }

    fn classic() -> Profile {
        defaults::profile(Mode::Classic, Theme::Dark)
    }

    fn engine(profile: Profile, limits: EngineLimits) -> Engine {
        Engine::new(profile, limits).unwrap()
    }

    fn snapshot(tree: &MemoryTree) -> String {
        markup::render(tree, tree.root())
    }

    fn marker(tree: &MemoryTree, name: &str) -> Option<NodeId> {
        tree.query(&Selector::attribute(attrs::SUCCESS_MARKER, name))
    }

    /// Log sink shared between the subscriber and the test
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    /// ERROR-level lines emitted while `action` runs
    fn error_lines(action: impl FnOnce()) -> Vec<String> {
        let captured = Captured::default();
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::ERROR)
            .with_ansi(false)
            .with_writer(captured.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, action);
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap().lines().map(str::to_string).collect()
    }

    #[test]
    fn test_classic_profile_converges() {
        let mut tree = page();
        let mut engine = engine(classic(), EngineLimits::default());

        assert_eq!(engine.start(&mut tree), Outcome::FullPass);
        assert_eq!(engine.state(), LoopState::Converged);
        assert!(engine.report().is_clean(), "{:?}", engine.report().skipped);
        assert!(tree.is_subscribed());
        // Engine edits never notify
        assert_eq!(tree.take_notifications(), 0);

        let masthead = tree.query(&Selector::id("masthead")).unwrap();
        assert_eq!(marker(&tree, "classic-dark"), Some(masthead));
        assert!(tree.has_class(masthead, "retrofit-profile-classic-dark"));
        assert!(tree.stylesheet(ids::STYLE_SLOT).is_some());

        let before = snapshot(&tree);
        let mutations = tree.mutation_count();
        for _ in 0..50 {
            assert_eq!(engine.on_notification(&mut tree), Outcome::NoOp);
        }
        assert_eq!(snapshot(&tree), before);
        assert_eq!(tree.mutation_count(), mutations);
        assert_eq!(engine.context().idle, 50);
    }

    #[test]
    fn test_reapplied_pass_adds_nothing() {
        let mut tree = page();
        let mut engine = engine(classic(), EngineLimits::default());
        engine.start(&mut tree);
        let before = snapshot(&tree);
        let created = engine.context().registry.len();

        // Host re-render drops the marker
        let masthead = tree.query(&Selector::id("masthead")).unwrap();
        tree.remove_attribute(masthead, attrs::SUCCESS_MARKER);
        assert_eq!(engine.pump(&mut tree), vec![Outcome::FullPass]);

        assert_eq!(snapshot(&tree), before);
        assert_eq!(engine.context().registry.len(), created);
        assert_eq!(engine.context().applied, 1);
    }

    #[test]
    fn test_swap_overrides_voice_search_align_left() {
        let mut plain = page();
        let mut reference = engine(classic(), EngineLimits::default());
        reference.start(&mut plain);

        let mut profile = classic();
        profile.voice_search.align_left = true;
        let mut tree = page();
        let mut engine = engine(profile, EngineLimits::default());
        engine.start(&mut tree);

        assert!(engine.report().is_clean(), "{:?}", engine.report().skipped);
        assert!(tree.query(&Selector::id("voice_search-retrofit-swap")).is_some());
        assert!(tree.query(&Selector::id("voice_search-retrofit")).is_none());
        assert_eq!(engine.context().registry.len(), reference.context().registry.len());

        let before = snapshot(&tree);
        let masthead = tree.query(&Selector::id("masthead")).unwrap();
        tree.remove_attribute(masthead, attrs::SUCCESS_MARKER);
        assert_eq!(engine.pump(&mut tree), vec![Outcome::FullPass]);
        assert_eq!(snapshot(&tree), before);
        assert!(tree.query(&Selector::id("voice_search-retrofit")).is_none());
    }

    #[test]
    fn test_idle_fail_safe_halts_once() {
        let mut tree = page();
        let limits = EngineLimits {
            max_idle_notifications: 10,
            ..EngineLimits::default()
        };
        let mut engine = engine(classic(), limits);
        engine.start(&mut tree);

        let logged = error_lines(|| {
            for _ in 0..10 {
                assert_eq!(engine.on_notification(&mut tree), Outcome::NoOp);
            }
            assert_eq!(engine.on_notification(&mut tree), Outcome::Halted);
        });
        assert_eq!(logged.len(), 1, "{logged:?}");
        assert!(logged[0].contains("ERROR"));
        assert!(logged[0].contains("Fail-safe tripped"));
        assert!(logged[0].contains("limit 10"));
        assert_eq!(engine.state(), LoopState::Halted);
        assert!(!tree.is_subscribed());

        let mutations = tree.mutation_count();
        let logged = error_lines(|| {
            for _ in 0..20 {
                assert_eq!(engine.on_notification(&mut tree), Outcome::Ignored);
            }
        });
        assert!(logged.is_empty(), "{logged:?}");
        assert_eq!(tree.mutation_count(), mutations);
        assert_eq!(engine.diagnostics().len(), 1);
        assert!(matches!(
            engine.diagnostics()[0],
            EngineError::RunawayLoop { value: 11, limit: 10, .. }
        ));
    }

    #[test]
    fn test_applied_fail_safe_on_marker_fight() {
        let mut tree = page();
        let limits = EngineLimits {
            max_applied_updates: 2,
            ..EngineLimits::default()
        };
        let mut engine = engine(classic(), limits);
        engine.start(&mut tree);

        let masthead = tree.query(&Selector::id("masthead")).unwrap();
        let mut outcomes = Vec::new();
        for _ in 0..5 {
            tree.remove_attribute(masthead, attrs::SUCCESS_MARKER);
            outcomes.push(engine.on_notification(&mut tree));
        }
        assert_eq!(
            outcomes,
            [Outcome::FullPass, Outcome::FullPass, Outcome::Halted, Outcome::Ignored, Outcome::Ignored]
        );
        assert_eq!(engine.diagnostics().len(), 1);
    }

    #[test]
    fn test_missing_region_is_one_error() {
        let mut tree = page();
        let avatar = tree.query(&Selector::id("avatar")).unwrap();
        tree.remove(avatar);
        let mut engine = engine(classic(), EngineLimits::default());

        let logged = error_lines(|| {
            assert_eq!(engine.start(&mut tree), Outcome::FullPass);
        });
        assert_eq!(logged.len(), 1, "{logged:?}");
        assert!(logged[0].contains("Region skipped"));
        assert!(logged[0].contains("avatar"));

        let report = engine.report();
        assert_eq!(report.skipped_regions(), vec!["avatar"]);
        assert!(report.applied.iter().any(|r| r == "title"));
        assert!(report.applied.iter().any(|r| r == "guide"));
        assert_eq!(engine.state(), LoopState::Converged);
    }

    #[test]
    fn test_refresh_tears_down_everything() {
        let mut tree = page();
        let pristine = snapshot(&tree);
        let mut engine = engine(classic(), EngineLimits::default());
        engine.start(&mut tree);

        let created: Vec<NodeId> = engine.context().registry.iter().collect();
        assert!(!created.is_empty());

        let outcome = engine.refresh(&mut tree, Some(Profile::disabled(Theme::Dark)));
        assert_eq!(outcome, Outcome::Ignored);
        assert!(created.iter().all(|node| !tree.contains(*node)));
        assert!(engine.context().registry.is_empty());
        assert!(marker(&tree, "classic-dark").is_none());
        assert!(!tree.is_subscribed());
        assert!(tree.stylesheet(ids::STYLE_SLOT).is_none());

        // Only locator tags remain on host nodes
        assert_eq!(strip(&snapshot(&tree), attrs::HANDLE), pristine);
    }

    /// Drop every ` name="..."` occurrence of an attribute from rendered markup
    fn strip(rendered: &str, name: &str) -> String {
        let needle = format!(" {name}=\"");
        let mut out = String::new();
        let mut rest = rendered;
        while let Some(start) = rest.find(&needle) {
            out.push_str(&rest[..start]);
            let after = &rest[start + needle.len()..];
            let end = after.find('"').unwrap();
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        out
    }

    #[test]
    fn test_refresh_rebuilds_with_fresh_nodes() {
        let mut tree = page();
        let mut engine = engine(classic(), EngineLimits::default());
        engine.start(&mut tree);
        let old: Vec<NodeId> = engine.context().registry.iter().collect();

        assert_eq!(engine.refresh(&mut tree, None), Outcome::FullPass);
        assert!(old.iter().all(|node| !tree.contains(*node)));
        assert_eq!(engine.context().registry.len(), old.len());
        assert_eq!(engine.context().passes, 1);
        assert_eq!(engine.context().applied, 0);
        assert!(engine.context().guide_preloaded);
    }

    #[test]
    fn test_profile_switch_swaps_class() {
        let mut tree = page();
        let mut engine = engine(classic(), EngineLimits::default());
        engine.start(&mut tree);

        let minimal = defaults::profile(Mode::Minimal, Theme::Dark);
        assert_eq!(engine.refresh(&mut tree, Some(minimal)), Outcome::FullPass);
        let masthead = tree.query(&Selector::id("masthead")).unwrap();
        assert!(tree.has_class(masthead, "retrofit-profile-minimal-dark"));
        assert!(!tree.has_class(masthead, "retrofit-profile-classic-dark"));
        assert_eq!(engine.context().previous_profile.as_deref(), Some("classic-dark"));
        assert!(tree.query(&Selector::id("search-retrofit-swap")).is_none());
    }

    #[test]
    fn test_narrow_path_follows_chips() {
        let mut tree = page();
        let mut engine = engine(classic(), EngineLimits::default());
        engine.start(&mut tree);
        assert!(tree.query(&Selector::id(ids::CONTEXT_HEADER)).is_some());

        let chips = tree.query(&Selector::id("chips-bar")).unwrap();
        tree.set_attribute(chips, "hidden", "");
        assert_eq!(engine.pump(&mut tree), vec![Outcome::NarrowUpdate]);
        assert!(tree.query(&Selector::id(ids::CONTEXT_HEADER)).is_none());
        assert_eq!(engine.context().applied, 1);
        assert_eq!(engine.context().idle, 0);

        tree.remove_attribute(chips, "hidden");
        assert_eq!(engine.pump(&mut tree), vec![Outcome::NarrowUpdate]);
        assert!(tree.query(&Selector::id(ids::CONTEXT_HEADER)).is_some());
    }

    #[test]
    fn test_late_guide_applied_by_retry() {
        let mut tree = page();
        let guide = tree.query(&Selector::id("guide")).unwrap();
        tree.remove(guide);
        let mut engine = engine(classic(), EngineLimits::default());

        engine.start(&mut tree);
        assert_eq!(engine.report().deferred, vec!["guide".to_string()]);
        assert!(!engine.context().guide_preloaded);

        // Nothing due yet
        assert_eq!(engine.advance(&mut tree, 100), 0);

        let wrapper = tree.query(&Selector::id("guide-wrapper")).unwrap();
        let nav = tree.create_element("nav");
        tree.set_attribute(nav, "id", "guide");
        tree.insert_before(wrapper, nav, None);
        tree.take_notifications();

        assert_eq!(engine.advance(&mut tree, 200), 1);
        assert!(engine.context().guide_preloaded);
        assert_eq!(tree.attribute(nav, attrs::PRELOADED), Some("true"));
        assert!(engine.report().deferred.is_empty());
        assert!(!engine.context().queue.has_pending("guide"));
    }

    #[test]
    fn test_halt_cancels_pending_retries() {
        let mut tree = page();
        let guide = tree.query(&Selector::id("guide")).unwrap();
        tree.remove(guide);
        let limits = EngineLimits {
            max_idle_notifications: 10,
            ..EngineLimits::default()
        };
        let mut engine = engine(classic(), limits);
        engine.start(&mut tree);
        assert!(engine.context().queue.has_pending("guide"));

        for _ in 0..11 {
            engine.on_notification(&mut tree);
        }
        assert_eq!(engine.state(), LoopState::Halted);
        assert_eq!(engine.context().queue.pending_count(), 0);
        assert_eq!(engine.advance(&mut tree, 10_000), 0);
    }

    #[test]
    fn test_disabled_mode_never_subscribes() {
        let mut tree = page();
        let before = snapshot(&tree);
        let mut engine = engine(Profile::disabled(Theme::Light), EngineLimits::default());

        assert_eq!(engine.start(&mut tree), Outcome::Ignored);
        assert!(!tree.is_subscribed());
        assert_eq!(engine.on_notification(&mut tree), Outcome::Ignored);
        assert_eq!(snapshot(&tree), before);
    }

    #[test]
    fn test_refresh_recovers_from_halt() {
        let mut tree = page();
        let limits = EngineLimits {
            max_idle_notifications: 10,
            ..EngineLimits::default()
        };
        let mut engine = engine(classic(), limits);
        engine.start(&mut tree);
        for _ in 0..11 {
            engine.on_notification(&mut tree);
        }
        assert_eq!(engine.state(), LoopState::Halted);

        assert_eq!(engine.refresh(&mut tree, None), Outcome::FullPass);
        assert_eq!(engine.state(), LoopState::Converged);
        assert!(tree.is_subscribed());
        assert_eq!(engine.context().idle, 0);
    }
}
