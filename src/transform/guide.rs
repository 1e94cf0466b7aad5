//! Side panel
//!
//! The host renders the guide late. With `preload` set, a missing guide is
//! not an error but a deferred retry; once it shows up it is tagged and the
//! context remembers it was preloaded.

use tracing::debug;

use super::Transformer;
use super::common::{Flow, apply_common};
use crate::config::Profile;
use crate::constants::attrs;
use crate::context::Pass;
use crate::error::EngineError;

pub struct Guide;

impl Transformer for Guide {
    fn region(&self) -> &'static str {
        "guide"
    }

    fn wanted(&self, profile: &Profile) -> bool {
        let guide = &profile.guide;
        guide.base.is_active() || guide.preload || guide.compact
    }

    fn apply(&self, pass: &mut Pass<'_>) -> Result<(), EngineError> {
        let profile = pass.profile();
        let settings = &profile.guide;

        match pass.locate("guide") {
            Ok(_) => {
                // Rendered before its retry came due
                pass.ctx.queue.cancel("guide");
                pass.ctx.queue.clear_attempts("guide");
            }
            Err(e) if settings.preload && matches!(e, EngineError::AbsentNode { .. }) => {
                return pass.defer("guide");
            }
            Err(e) => return Err(e),
        }

        let Flow::Continue(handle) = apply_common(pass, "guide", &settings.base, None)? else {
            return Ok(());
        };
        if settings.compact {
            pass.set_host_attribute(handle.node, "mini", "");
        }
        if settings.preload && !pass.ctx.guide_preloaded {
            pass.set_host_attribute(handle.node, attrs::PRELOADED, "true");
            pass.ctx.guide_preloaded = true;
            debug!("Side panel preloaded");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{EngineContext, EngineLimits};
    use crate::dom::{Document, MemoryTree, Selector};
    use crate::guard::guarded;
    use crate::locator::NodeLocator;
    use crate::transform::run;

    fn context(preload: bool) -> EngineContext {
        let mut profile = Profile::default();
        profile.guide.preload = preload;
        profile.guide.compact = true;
        let limits = EngineLimits {
            max_retry_attempts: 2,
            ..EngineLimits::default()
        };
        EngineContext::new(profile, NodeLocator::with_default_table().unwrap(), limits)
    }

    fn apply(tree: &mut MemoryTree, ctx: &mut EngineContext) -> bool {
        guarded(tree, |g| {
            let mut pass = Pass::new(g, ctx);
            run(&Guide, &mut pass)
        })
    }

    #[test]
    fn test_missing_guide_is_deferred_then_applied() {
        let mut tree = MemoryTree::from_markup(r#"<body><div id="guide-wrapper"/></body>"#).unwrap();
        let mut ctx = context(true);

        assert!(!apply(&mut tree, &mut ctx));
        assert!(ctx.report.is_clean());
        assert_eq!(ctx.report.deferred, vec!["guide".to_string()]);
        assert!(ctx.queue.has_pending("guide"));
        assert!(!ctx.guide_preloaded);

        // Host renders the panel
        let wrapper = tree.query(&Selector::id("guide-wrapper")).unwrap();
        let nav = tree.create_element("nav");
        tree.insert_before(wrapper, nav, None);
        ctx.report = Default::default();

        assert!(apply(&mut tree, &mut ctx));
        assert!(ctx.guide_preloaded);
        assert_eq!(tree.attribute(nav, attrs::PRELOADED), Some("true"));
        assert_eq!(tree.attribute(nav, "mini"), Some(""));
        assert_eq!(ctx.queue.attempts("guide"), 0);
        assert!(!ctx.queue.has_pending("guide"));
        assert_eq!(ctx.queue.pop_due(u64::MAX), None);
    }

    #[test]
    fn test_retry_budget_exhaustion_is_one_error() {
        let mut tree = MemoryTree::from_markup("<body/>").unwrap();
        let mut ctx = context(true);

        for _ in 0..2 {
            apply(&mut tree, &mut ctx);
            ctx.queue.pop_due(u64::MAX);
        }
        assert!(ctx.report.is_clean());
        assert!(!apply(&mut tree, &mut ctx));
        assert_eq!(ctx.report.error_count(), 1);
        assert!(matches!(ctx.report.skipped[0].1, EngineError::RetryExhausted { attempts: 2, .. }));
    }

    #[test]
    fn test_missing_guide_without_preload_is_absent() {
        let mut tree = MemoryTree::from_markup("<body/>").unwrap();
        let mut ctx = context(false);
        assert!(!apply(&mut tree, &mut ctx));
        assert_eq!(ctx.report.skipped_regions(), vec!["guide"]);
        assert!(!ctx.queue.has_pending("guide"));
    }
}
