//! Clone/relocate primitives
//!
//! Host nodes are never moved. To show a node somewhere else the engine
//! inserts a deep copy, hides the original through the stylesheet and points
//! the region's logical style target and locator entry at the copy.

use tracing::{debug, trace};

use crate::constants::{attrs, ids};
use crate::context::Pass;
use crate::dom::{Document, NodeId, Selector};
use crate::error::EngineError;
use crate::locator::NodeHandle;

/// Make a detached copy of `source` that can stand in for it
fn prepare_clone(tree: &mut dyn Document, source: NodeId, clone_id: &str) -> Option<NodeId> {
    let clone = tree.deep_clone(source)?;
    strip_handles(tree, clone);
    tree.set_attribute(clone, "id", clone_id);
    tree.remove_attribute(clone, attrs::HIDDEN);
    tree.set_attribute(clone, attrs::CREATED, "");
    Some(clone)
}

/// Copies must never answer a locator lookup for the original
fn strip_handles(tree: &mut dyn Document, node: NodeId) {
    tree.remove_attribute(node, attrs::HANDLE);
    for child in tree.children(node) {
        strip_handles(tree, child);
    }
}

/// Route a logical name to a clone: locator alias plus style retarget
fn stand_in(pass: &mut Pass<'_>, name: &str, clone_id: &str) {
    let selector = Selector::id(clone_id);
    pass.ctx.sheet.retarget(name, selector.as_str());
    pass.ctx.locator.alias(name, selector);
}

fn existing_clone(pass: &Pass<'_>, clone_id: &str) -> Option<NodeId> {
    pass.tree
        .query(&Selector::id(clone_id))
        .filter(|node| pass.tree.is_created(*node))
}

/// Duplicate the node behind `source_name`, hide the original and insert
/// the copy as the first child of `container`. Reuses a live clone.
pub fn clone_and_relocate(
    pass: &mut Pass<'_>,
    source_name: &str,
    source_id: &str,
    container: &str,
) -> Result<NodeId, EngineError> {
    let clone_id = format!("{source_id}{}", ids::RELOCATE_SUFFIX);

    if let Some(clone) = existing_clone(pass, &clone_id) {
        trace!(source = %source_name, clone = %clone_id, "Relocated clone already present");
        stand_in(pass, source_name, &clone_id);
        return Ok(clone);
    }

    let source = pass.ctx.locator.locate_original(&mut *pass.tree, source_name)?;
    let container = pass.locate(container)?;

    let clone = prepare_clone(&mut *pass.tree, source.node, &clone_id)
        .ok_or_else(|| EngineError::absent(source_name, "source vanished while cloning"))?;
    let first = pass.tree.children(container.node).first().copied();
    pass.insert_created(container.node, clone, first);

    pass.ctx.sheet.hide(&source.selector);
    stand_in(pass, source_name, &clone_id);
    debug!(source = %source_name, clone = %clone_id, container = %container.name, "Relocated element");
    Ok(clone)
}

/// Show `first` and `second` in swapped order without touching host order.
///
/// Each side is cloned, the clone of `second` goes where `first` sits and
/// the clone of `first` where `second` sits; both originals are hidden.
/// A side that is already an engine clone (relocated earlier, or a stale
/// swap copy) is removed once its replacement is in place.
pub fn clone_and_swap(
    pass: &mut Pass<'_>,
    first_name: &str,
    second_name: &str,
    first_id: &str,
    second_id: &str,
) -> Result<(NodeId, NodeId), EngineError> {
    let first_clone_id = format!("{first_id}{}", ids::SWAP_SUFFIX);
    let second_clone_id = format!("{second_id}{}", ids::SWAP_SUFFIX);

    if let (Some(a), Some(b)) = (
        existing_clone(pass, &first_clone_id),
        existing_clone(pass, &second_clone_id),
    ) {
        trace!(first = %first_name, second = %second_name, "Swap clones already present");
        stand_in(pass, first_name, &first_clone_id);
        stand_in(pass, second_name, &second_clone_id);
        return Ok((a, b));
    }

    let first = pass.locate(first_name)?;
    let second = pass.locate(second_name)?;
    let first_parent = parent_of(pass, &first)?;
    let second_parent = parent_of(pass, &second)?;

    let first_clone = prepare_clone(&mut *pass.tree, first.node, &first_clone_id)
        .ok_or_else(|| EngineError::absent(first_name, "source vanished while cloning"))?;
    let second_clone = prepare_clone(&mut *pass.tree, second.node, &second_clone_id)
        .ok_or_else(|| EngineError::absent(second_name, "source vanished while cloning"))?;

    pass.insert_created(first_parent, second_clone, Some(first.node));
    pass.insert_created(second_parent, first_clone, Some(second.node));

    for side in [&first, &second] {
        if side.is_clone {
            // The original behind it is already hidden
            debug!(name = %side.name, node = %side.node, "Removing stale clone after re-entrant swap");
            pass.remove_created(side.node);
        } else {
            pass.ctx.sheet.hide(&side.selector);
        }
    }

    stand_in(pass, first_name, &first_clone_id);
    stand_in(pass, second_name, &second_clone_id);
    debug!(first = %first_name, second = %second_name, "Swapped elements");
    Ok((first_clone, second_clone))
}

fn parent_of(pass: &Pass<'_>, handle: &NodeHandle) -> Result<NodeId, EngineError> {
    pass.tree
        .parent(handle.node)
        .ok_or_else(|| EngineError::absent(handle.name.clone(), "element has no parent"))
}
