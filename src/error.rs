//! Error taxonomy for the engine
//!
//! Nothing here is allowed to escape into the host: callers log these and
//! either skip the affected region or halt the loop.

use thiserror::Error;

use crate::dom::selector::SelectorError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A named lookup found nothing. Expected on many page types.
    #[error("element '{name}' not found (tried {tried})")]
    AbsentNode { name: String, tried: String },

    /// A deferred wait for an element ran out of attempts
    #[error("element '{name}' did not appear after {attempts} attempts")]
    RetryExhausted { name: String, attempts: u32 },

    /// A custom asset (inline icon markup) could not be parsed
    #[error("malformed asset for region '{region}': {reason}")]
    MalformedAsset { region: String, reason: String },

    /// One of the fail-safe counters went over its ceiling
    #[error("runaway loop: {counter} counter reached {value} (limit {limit})")]
    RunawayLoop {
        counter: &'static str,
        value: u32,
        limit: u32,
    },

    /// The settings store rejected a read or write
    #[error("settings store failed for key '{key}': {reason}")]
    Persistence { key: String, reason: String },

    /// A selector in the locator table or a primitive call did not parse
    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
}

impl From<SelectorError> for EngineError {
    fn from(e: SelectorError) -> Self {
        EngineError::InvalidSelector {
            selector: e.selector,
            reason: e.reason,
        }
    }
}

impl EngineError {
    pub fn absent(name: impl Into<String>, tried: impl Into<String>) -> Self {
        EngineError::AbsentNode {
            name: name.into(),
            tried: tried.into(),
        }
    }

    /// Absent-node style errors are expected and only skip a region
    pub fn is_absence(&self) -> bool {
        matches!(
            self,
            EngineError::AbsentNode { .. } | EngineError::RetryExhausted { .. }
        )
    }
}
