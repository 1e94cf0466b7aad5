//! Chips bar and the synthesized context header
//!
//! While the host shows its chips bar, a header naming the current context
//! sits right before it. The host toggles the bar on its own schedule, so
//! the header is also kept in sync by the narrow reconciliation path.

use tracing::debug;

use super::Transformer;
use super::common::{Flow, apply_common};
use crate::config::Profile;
use crate::constants::{classes, ids};
use crate::context::Pass;
use crate::dom::{NodeId, Selector};
use crate::error::EngineError;

pub struct Chips;

impl Transformer for Chips {
    fn region(&self) -> &'static str {
        "chips"
    }

    fn wanted(&self, profile: &Profile) -> bool {
        profile.chips.base.is_active() || profile.chips.context_header
    }

    fn apply(&self, pass: &mut Pass<'_>) -> Result<(), EngineError> {
        let profile = pass.profile();
        if let Flow::Removed = apply_common(pass, "chips", &profile.chips.base, None)? {
            // A hidden bar takes its header along
            if let Some(header) = context_header(pass) {
                pass.remove_created(header);
            }
            return Ok(());
        }
        sync_context_header(pass)?;
        Ok(())
    }

    fn sync(&self, pass: &mut Pass<'_>) -> Result<bool, EngineError> {
        sync_context_header(pass)
    }
}

fn context_header(pass: &Pass<'_>) -> Option<NodeId> {
    pass.tree
        .query(&Selector::id(ids::CONTEXT_HEADER))
        .filter(|node| pass.tree.is_created(*node))
}

/// Text for the header: configured, else the selected chip
fn header_text(pass: &Pass<'_>, chips: NodeId, configured: Option<&str>) -> Result<Option<String>, EngineError> {
    if let Some(text) = configured {
        return Ok(Some(text.to_string()));
    }
    let selected = Selector::parse("[aria-selected=\"true\"]")?;
    Ok(pass
        .tree
        .query_within(chips, &selected)
        .map(|chip| pass.tree.host_text(chip).trim().to_string())
        .filter(|text| !text.is_empty()))
}

/// Create, update, move or remove the context header to match the chips
/// bar. Returns true if the tree changed.
pub fn sync_context_header(pass: &mut Pass<'_>) -> Result<bool, EngineError> {
    let profile = pass.profile();
    let settings = &profile.chips;
    if !settings.context_header || settings.base.remove {
        return Ok(false);
    }

    let existing = context_header(pass);
    let chips = match pass.locate("chips") {
        Ok(handle) => handle,
        Err(e) => {
            if let Some(header) = existing {
                debug!("Chips bar gone, dropping context header");
                pass.remove_created(header);
                return Ok(true);
            }
            return Err(e);
        }
    };

    let text = if pass.tree.is_hidden(chips.node) {
        None
    } else {
        header_text(pass, chips.node, settings.header_text.as_deref())?
    };

    let Some(text) = text else {
        return Ok(match existing {
            Some(header) => {
                debug!("Chips bar hidden, dropping context header");
                pass.remove_created(header);
                true
            }
            None => false,
        });
    };

    let parent = pass
        .tree
        .parent(chips.node)
        .ok_or_else(|| EngineError::absent("chips", "chips bar has no parent"))?;

    match existing {
        Some(header) => {
            let mut changed = false;
            if pass.tree.own_text(header) != text {
                pass.tree.set_own_text(header, &text);
                changed = true;
            }
            let siblings = pass.tree.children(parent);
            let in_place = siblings
                .iter()
                .position(|n| *n == header)
                .is_some_and(|i| siblings.get(i + 1) == Some(&chips.node));
            if !in_place {
                pass.tree.insert_before(parent, header, Some(chips.node));
                changed = true;
            }
            Ok(changed)
        }
        None => {
            let header = pass.create("div");
            pass.tree.set_attribute(header, "id", ids::CONTEXT_HEADER);
            pass.tree.add_class(header, classes::CONTEXT_HEADER);
            pass.tree.set_own_text(header, &text);
            pass.insert_created(parent, header, Some(chips.node));
            debug!(text = %text, "Synthesized context header");
            Ok(true)
        }
    }
}
