//! Guarded mutation wrapper
//!
//! The engine's own edits are tree mutations too. Every structural or
//! attribute edit happens inside [`guarded`], which suspends the change feed
//! for the duration of the batch. Code that edits the tree only ever sees a
//! [`GuardedTree`], so an unguarded edit cannot be written.

use tracing::trace;

use crate::dom::Document;

/// Tree access that only exists while notifications are suspended
pub struct GuardedTree<'a> {
    tree: &'a mut dyn Document,
}

impl GuardedTree<'_> {
    pub fn tree(&mut self) -> &mut dyn Document {
        &mut *self.tree
    }
}

/// Run `action` with the change feed suspended, then restore it.
/// The feed is only resumed if it was active on entry.
pub fn guarded<R>(tree: &mut dyn Document, action: impl FnOnce(&mut GuardedTree<'_>) -> R) -> R {
    let resubscribe = tree.is_subscribed();
    if resubscribe {
        tree.unsubscribe();
    }
    trace!(resubscribe = resubscribe, "Entering guarded mutation");

    let result = {
        let mut guard = GuardedTree { tree: &mut *tree };
        action(&mut guard)
    };

    if resubscribe {
        tree.subscribe();
    }
    result
}
