//! Search box
//!
//! Alignment is special here: `swap_with_voice` shows the search box and
//! the voice search button in swapped order and takes precedence over
//! `align_left`.

use tracing::debug;

use super::Transformer;
use super::common::style;
use crate::config::Profile;
use crate::context::Pass;
use crate::dom::Selector;
use crate::error::EngineError;
use crate::primitives::{clone_and_relocate, clone_and_swap};

pub struct Search;

impl Transformer for Search {
    fn region(&self) -> &'static str {
        "search"
    }

    fn wanted(&self, profile: &Profile) -> bool {
        let search = &profile.search;
        search.base.is_active() || search.placeholder.is_some() || search.swap_with_voice
    }

    fn apply(&self, pass: &mut Pass<'_>) -> Result<(), EngineError> {
        let profile = pass.profile();
        let settings = &profile.search;

        pass.locate("search")?;
        if settings.base.remove {
            pass.hide("search");
            return Ok(());
        }

        if settings.swap_with_voice {
            if settings.base.align_left {
                debug!("swap_with_voice overrides align_left");
            }
            clone_and_swap(pass, "search", "voice_search", "search", "voice_search")?;
        } else if settings.base.align_left {
            clone_and_relocate(pass, "search", "search", "start")?;
        }
        let handle = pass.locate("search")?;

        style(pass, "search", &handle, &settings.base)?;

        if let Some(placeholder) = &settings.placeholder {
            let input = pass
                .tree
                .query_within(handle.node, &Selector::parse("input")?)
                .ok_or_else(|| EngineError::absent("search input", "'input' inside search"))?;
            pass.set_host_attribute(input, "placeholder", placeholder);
        }
        Ok(())
    }
}
