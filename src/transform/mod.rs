//! Transformer set
//!
//! One transformer per region. Each reads its own typed settings from the
//! active profile and applies a bounded set of idempotent edits through a
//! [`Pass`]. Errors are caught per region by [`run`]: the region is logged
//! and skipped, the rest of the pass carries on.

pub mod chips;
pub mod common;
pub mod guide;
pub mod masthead;
pub mod search;
pub mod styled;
pub mod tooltips;

use tracing::{debug_span, error, trace};

use crate::config::Profile;
use crate::context::Pass;
use crate::error::EngineError;

pub trait Transformer {
    fn region(&self) -> &'static str;

    /// Whether the profile asks this region for anything at all
    fn wanted(&self, profile: &Profile) -> bool;

    fn apply(&self, pass: &mut Pass<'_>) -> Result<(), EngineError>;

    /// Narrow follow-up run on notifications once converged.
    /// Returns true if it changed the tree.
    fn sync(&self, _pass: &mut Pass<'_>) -> Result<bool, EngineError> {
        Ok(false)
    }
}

/// Every transformer in application order
pub fn full_set() -> Vec<Box<dyn Transformer>> {
    vec![
        Box::new(masthead::Masthead),
        Box::new(masthead::Logo),
        Box::new(search::Search),
        Box::new(styled::Styled::VOICE_SEARCH),
        Box::new(styled::Styled::CREATE),
        Box::new(masthead::Notifications),
        Box::new(styled::Styled::AVATAR),
        Box::new(styled::Styled::APPS),
        Box::new(guide::Guide),
        Box::new(chips::Chips),
        Box::new(tooltips::Tooltips),
        Box::new(styled::Styled::SUBSCRIBE),
        Box::new(styled::Styled::TITLE),
    ]
}

/// Apply one transformer, logging and recording a failure instead of
/// propagating it. Returns true if the region applied.
pub fn run(transformer: &dyn Transformer, pass: &mut Pass<'_>) -> bool {
    let region = transformer.region();
    let span = debug_span!("region", region = %region);
    let _enter = span.enter();

    match transformer.apply(pass) {
        Ok(()) if pass.ctx.report.deferred.iter().any(|d| d == region) => {
            trace!("Region deferred");
            false
        }
        Ok(()) => {
            trace!("Region applied");
            pass.ctx.report.applied.push(region.to_string());
            true
        }
        Err(e) => {
            error!(region = %region, error = %e, "Region skipped");
            pass.ctx.report.skipped.push((region.to_string(), e));
            false
        }
    }
}

/// Narrow counterpart of [`run`]; a failed sync counts as no change
pub fn run_sync(transformer: &dyn Transformer, pass: &mut Pass<'_>) -> bool {
    let region = transformer.region();
    match transformer.sync(pass) {
        Ok(changed) => changed,
        Err(e) if e.is_absence() => {
            trace!(region = %region, error = %e, "Narrow sync found nothing");
            false
        }
        Err(e) => {
            error!(region = %region, error = %e, "Narrow sync failed");
            pass.ctx.report.skipped.push((region.to_string(), e));
            false
        }
    }
}
