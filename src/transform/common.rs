//! Options shared by every region
//!
//! Applied in a fixed order: visibility, alignment, sizing, color/shadow,
//! icon, text, hover. Removal short-circuits the rest; every later step can
//! rely on the structural edits of the earlier ones.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tracing::{debug, trace};

use crate::config::RegionSettings;
use crate::constants::{attrs, classes, ids};
use crate::context::Pass;
use crate::dom::markup;
use crate::error::EngineError;
use crate::locator::NodeHandle;
use crate::primitives::clone_and_relocate;

/// Outcome of the visibility step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    /// Region is styled; carries the handle after alignment
    Continue(NodeHandle),
    /// Region is hidden, nothing else applies
    Removed,
}

/// Locate `region`, then run the whole common policy.
/// `left_container` is where `align_left` relocates to, if anywhere.
pub fn apply_common(
    pass: &mut Pass<'_>,
    region: &str,
    settings: &RegionSettings,
    left_container: Option<&str>,
) -> Result<Flow, EngineError> {
    let handle = pass.locate(region)?;
    if settings.remove {
        pass.hide(region);
        return Ok(Flow::Removed);
    }

    let handle = match (settings.align_left, left_container) {
        (true, Some(_)) if is_swap_clone(pass, &handle) => {
            // Another region already shows this one in swapped order
            debug!(region = %region, "Swap overrides align_left");
            handle
        }
        (true, Some(container)) => {
            clone_and_relocate(pass, region, region, container)?;
            pass.locate(region)?
        }
        (true, None) => {
            trace!(region = %region, "align_left has no target here, ignoring");
            handle
        }
        (false, _) => handle,
    };

    style(pass, region, &handle, settings)?;
    Ok(Flow::Continue(handle))
}

fn is_swap_clone(pass: &Pass<'_>, handle: &NodeHandle) -> bool {
    handle.is_clone
        && pass
            .tree
            .attribute(handle.node, "id")
            .is_some_and(|id| id.ends_with(ids::SWAP_SUFFIX))
}

fn declarations<'a>(pairs: &[(&'a str, &'a Option<String>)]) -> Vec<(&'a str, &'a str)> {
    pairs
        .iter()
        .filter_map(|(property, value)| value.as_deref().map(|v| (*property, v)))
        .collect()
}

/// Sizing through hover, for an already located and aligned region
pub fn style(
    pass: &mut Pass<'_>,
    region: &str,
    handle: &NodeHandle,
    settings: &RegionSettings,
) -> Result<(), EngineError> {
    let sizing = declarations(&[("width", &settings.width), ("height", &settings.height)]);
    pass.rule(region, "", &sizing);

    let paint = declarations(&[
        ("color", &settings.color),
        ("background-color", &settings.background),
        ("box-shadow", &settings.shadow),
        ("border-radius", &settings.border_radius),
    ]);
    pass.rule(region, "", &paint);

    if let Some(icon) = &settings.icon {
        apply_icon(pass, region, handle, icon)?;
    }
    if let Some(text) = &settings.text {
        apply_text(pass, region, handle, text);
    }

    let hover = declarations(&[
        ("color", &settings.hover_color),
        ("background-color", &settings.hover_background),
    ]);
    pass.rule(region, ":hover", &hover);
    Ok(())
}

fn asset_key(markup: &str) -> String {
    let mut hasher = DefaultHasher::new();
    markup.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Insert an inline icon as the first child of the region.
/// Malformed markup leaves the node untouched.
pub fn apply_icon(
    pass: &mut Pass<'_>,
    region: &str,
    handle: &NodeHandle,
    source: &str,
) -> Result<(), EngineError> {
    let key = asset_key(source);
    let existing = pass.created_child(handle.node, classes::ICON);
    if let Some(icon) = existing
        && pass.tree.attribute(icon, attrs::ASSET) == Some(key.as_str())
    {
        return Ok(());
    }

    let parsed = markup::parse(source).map_err(|e| EngineError::MalformedAsset {
        region: region.to_string(),
        reason: e.to_string(),
    })?;

    if let Some(stale) = existing {
        pass.remove_created(stale);
    }

    let span = pass.create("span");
    pass.tree.add_class(span, classes::ICON);
    pass.tree.set_attribute(span, attrs::ASSET, &key);
    let graphic = markup::instantiate(&mut *pass.tree, &parsed);
    pass.tree.insert_before(span, graphic, None);

    let first = pass.tree.children(handle.node).first().copied();
    pass.insert_created(handle.node, span, first);
    pass.rule(region, " svg:not(.retrofit-icon svg)", &[("display", "none")]);
    Ok(())
}

/// Show `text` in a synthetic span and zero the host's own text size.
/// Returns true if the tree changed.
pub fn apply_text(pass: &mut Pass<'_>, region: &str, handle: &NodeHandle, text: &str) -> bool {
    let changed = match pass.created_child(handle.node, classes::TEXT) {
        Some(span) if pass.tree.own_text(span) == text => false,
        Some(span) => {
            pass.tree.set_own_text(span, text);
            true
        }
        None => {
            let span = pass.create("span");
            pass.tree.add_class(span, classes::TEXT);
            pass.tree.set_own_text(span, text);
            pass.insert_created(handle.node, span, None);
            true
        }
    };

    pass.rule(region, "", &[("font-size", "0")]);
    pass.rule(region, " > .retrofit-text", &[("font-size", "14px")]);
    changed
}
