//! Regions that only take the common options

use super::Transformer;
use super::common::apply_common;
use crate::config::{Profile, RegionSettings};
use crate::context::Pass;
use crate::error::EngineError;

/// A region styled purely by the common policy
pub struct Styled {
    region: &'static str,
    /// Container `align_left` relocates into, if the region can move
    left_container: Option<&'static str>,
    settings: fn(&Profile) -> &RegionSettings,
}

impl Styled {
    pub const VOICE_SEARCH: Styled = Styled {
        region: "voice_search",
        left_container: Some("start"),
        settings: |p| &p.voice_search,
    };

    pub const CREATE: Styled = Styled {
        region: "create",
        left_container: Some("start"),
        settings: |p| &p.create,
    };

    pub const AVATAR: Styled = Styled {
        region: "avatar",
        left_container: Some("start"),
        settings: |p| &p.avatar,
    };

    pub const APPS: Styled = Styled {
        region: "apps",
        left_container: Some("start"),
        settings: |p| &p.apps,
    };

    pub const SUBSCRIBE: Styled = Styled {
        region: "subscribe",
        left_container: None,
        settings: |p| &p.subscribe,
    };

    pub const TITLE: Styled = Styled {
        region: "title",
        left_container: None,
        settings: |p| &p.title,
    };
}

impl Transformer for Styled {
    fn region(&self) -> &'static str {
        self.region
    }

    fn wanted(&self, profile: &Profile) -> bool {
        (self.settings)(profile).is_active()
    }

    fn apply(&self, pass: &mut Pass<'_>) -> Result<(), EngineError> {
        let profile = pass.profile();
        apply_common(pass, self.region, (self.settings)(&profile), self.left_container)?;
        Ok(())
    }
}
