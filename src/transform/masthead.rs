//! Masthead regions with options of their own

use super::Transformer;
use super::common::{Flow, apply_common};
use crate::config::Profile;
use crate::context::Pass;
use crate::error::EngineError;

pub struct Masthead;

impl Transformer for Masthead {
    fn region(&self) -> &'static str {
        "masthead"
    }

    fn wanted(&self, profile: &Profile) -> bool {
        profile.masthead.base.is_active() || profile.masthead.sticky
    }

    fn apply(&self, pass: &mut Pass<'_>) -> Result<(), EngineError> {
        let profile = pass.profile();
        let settings = &profile.masthead;

        // The masthead is a container, it has nowhere to move to
        if let Flow::Removed = apply_common(pass, "masthead", &settings.base, None)? {
            return Ok(());
        }
        if settings.sticky {
            pass.rule(
                "masthead",
                "",
                &[("position", "sticky"), ("top", "0"), ("z-index", "2000")],
            );
        }
        Ok(())
    }
}

pub struct Logo;

impl Transformer for Logo {
    fn region(&self) -> &'static str {
        "logo"
    }

    fn wanted(&self, profile: &Profile) -> bool {
        profile.logo.base.is_active() || profile.logo.link_target.is_some()
    }

    fn apply(&self, pass: &mut Pass<'_>) -> Result<(), EngineError> {
        let profile = pass.profile();
        let settings = &profile.logo;

        let Flow::Continue(handle) = apply_common(pass, "logo", &settings.base, Some("start"))? else {
            return Ok(());
        };
        if let Some(target) = &settings.link_target {
            pass.set_host_attribute(handle.node, "href", target);
        }
        Ok(())
    }
}

pub struct Notifications;

impl Transformer for Notifications {
    fn region(&self) -> &'static str {
        "notifications"
    }

    fn wanted(&self, profile: &Profile) -> bool {
        profile.notifications.base.is_active() || profile.notifications.hide_badge
    }

    fn apply(&self, pass: &mut Pass<'_>) -> Result<(), EngineError> {
        let profile = pass.profile();
        let settings = &profile.notifications;

        if let Flow::Removed = apply_common(pass, "notifications", &settings.base, Some("start"))? {
            return Ok(());
        }
        if settings.hide_badge {
            pass.rule("notifications", " .badge", &[("display", "none")]);
        }
        Ok(())
    }
}
