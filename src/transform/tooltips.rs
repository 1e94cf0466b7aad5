//! Tooltip labels
//!
//! Tooltips have no stable identifiers; they are found by their text once
//! the host renders them and registered as dynamic locator entries. Host
//! tooltips render lazily, so discovery also runs on the narrow path.

use tracing::trace;

use super::Transformer;
use super::common::apply_text;
use crate::config::Profile;
use crate::context::Pass;
use crate::dom::Selector;
use crate::error::EngineError;

const TOOLTIP_SCOPE: &str = "[role=\"tooltip\"]";

pub struct Tooltips;

impl Transformer for Tooltips {
    fn region(&self) -> &'static str {
        "tooltips"
    }

    fn wanted(&self, profile: &Profile) -> bool {
        let tooltips = &profile.tooltips;
        tooltips.base.is_active() || !tooltips.labels.is_empty()
    }

    fn apply(&self, pass: &mut Pass<'_>) -> Result<(), EngineError> {
        let profile = pass.profile();
        if profile.tooltips.base.remove {
            pass.ctx.sheet.hide(TOOLTIP_SCOPE);
            return Ok(());
        }
        substitute(pass)?;
        Ok(())
    }

    fn sync(&self, pass: &mut Pass<'_>) -> Result<bool, EngineError> {
        if pass.ctx.profile.tooltips.base.remove {
            return Ok(false);
        }
        substitute(pass)
    }
}

/// Replace the text of every rendered tooltip that has a label.
/// Returns true if the tree changed.
fn substitute(pass: &mut Pass<'_>) -> Result<bool, EngineError> {
    let profile = pass.profile();
    let settings = &profile.tooltips;
    let scope = Selector::parse(TOOLTIP_SCOPE)?;

    let mut changed = false;
    for (index, (from, to)) in settings.labels.iter().enumerate() {
        let name = format!("tooltip-{index}");
        if !pass.ctx.locator.discover_by_text(&mut *pass.tree, &name, &scope, from) {
            trace!(label = %from, "Tooltip not rendered yet");
            continue;
        }
        let handle = pass.locate(&name)?;
        changed |= apply_text(pass, &name, &handle, to);

        let mut paint = Vec::new();
        if let Some(color) = &settings.base.color {
            paint.push(("color", color.as_str()));
        }
        if let Some(background) = &settings.base.background {
            paint.push(("background-color", background.as_str()));
        }
        pass.rule(&name, "", &paint);
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{EngineContext, EngineLimits};
    use crate::dom::{Document, MemoryTree};
    use crate::guard::guarded;
    use crate::locator::NodeLocator;

    fn context() -> EngineContext {
        let mut profile = Profile::default();
        profile.tooltips.labels.insert("Create".to_string(), "Upload".to_string());
        profile.tooltips.labels.insert("Notifications".to_string(), "Inbox".to_string());
        profile.tooltips.base.background = Some("#333".to_string());
        EngineContext::new(profile, NodeLocator::with_default_table().unwrap(), EngineLimits::default())
    }

    fn sync(tree: &mut MemoryTree, ctx: &mut EngineContext) -> bool {
        guarded(tree, |g| {
            let mut pass = Pass::new(g, ctx);
            Tooltips.sync(&mut pass).unwrap()
        })
    }

    #[test]
    fn test_labels_substituted_once_rendered() {
        let mut tree = MemoryTree::from_markup(
            r#"<body><div id="popups"><div role="tooltip">Create</div></div></body>"#,
        )
        .unwrap();
        let mut ctx = context();

        assert!(sync(&mut tree, &mut ctx));
        assert!(!sync(&mut tree, &mut ctx));
        assert_eq!(ctx.registry.len(), 1);

        // Second tooltip shows up on hover
        let popups = tree.query(&Selector::id("popups")).unwrap();
        let tip = tree.create_element("div");
        tree.set_attribute(tip, "role", "tooltip");
        tree.set_own_text(tip, "Notifications");
        tree.insert_before(popups, tip, None);

        assert!(sync(&mut tree, &mut ctx));
        assert_eq!(tree.text(tip), "NotificationsInbox");
        assert_eq!(tree.host_text(tip), "Notifications");
        let css = ctx.sheet.render();
        assert!(css.contains("[data-retrofit-id=\"tooltip-1\"] { background-color: #333 !important; }"));
        assert!(css.contains("[data-retrofit-id=\"tooltip-0\"] { font-size: 0 !important; }"));
    }

    #[test]
    fn test_remove_hides_all_tooltips() {
        let mut tree = MemoryTree::from_markup(r#"<body><div role="tooltip">Create</div></body>"#).unwrap();
        let mut ctx = context();
        let mut profile = (*ctx.profile).clone();
        profile.tooltips.base.remove = true;
        ctx.profile = std::rc::Rc::new(profile);

        guarded(&mut tree, |g| {
            let mut pass = Pass::new(g, &mut ctx);
            Tooltips.apply(&mut pass)
        })
        .unwrap();
        assert!(ctx.sheet.hides(TOOLTIP_SCOPE));
        assert!(ctx.registry.is_empty());
        assert!(!sync(&mut tree, &mut ctx));
    }
}
