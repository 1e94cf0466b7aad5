//! Application-wide constants
//!
//! This module contains all magic numbers and string literals used throughout
//! the engine, providing a single source of truth for constant values.

/// Version tag carried by the root logging span
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Attributes and class names the engine writes into the host tree
pub mod attrs {
    /// Success marker placed on the root header once a pass completes.
    /// Value is the active profile name.
    pub const SUCCESS_MARKER: &str = "data-retrofit-applied";

    /// Stable identifier attribute written by the node locator
    pub const HANDLE: &str = "data-retrofit-id";

    /// Present on every node the engine inserted itself
    pub const CREATED: &str = "data-retrofit-created";

    /// Asset key on synthetic icon spans (used for idempotence)
    pub const ASSET: &str = "data-retrofit-asset";

    /// Set on the side panel once it has been preloaded
    pub const PRELOADED: &str = "data-retrofit-preloaded";

    /// Prefix of the active-profile class applied to the root header
    pub const PROFILE_CLASS_PREFIX: &str = "retrofit-profile-";

    /// Host attribute that hides a node
    pub const HIDDEN: &str = "hidden";
}

/// Class names of synthetic nodes
pub mod classes {
    pub const TEXT: &str = "retrofit-text";
    pub const ICON: &str = "retrofit-icon";
    pub const CONTEXT_HEADER: &str = "retrofit-context-header";
}

/// Identifiers derived for clones and synthetic nodes
pub mod ids {
    /// Suffix appended to the source id of a relocated clone
    pub const RELOCATE_SUFFIX: &str = "-retrofit";

    /// Suffix appended to the source id of a swapped clone
    pub const SWAP_SUFFIX: &str = "-retrofit-swap";

    /// Id of the synthesized context header
    pub const CONTEXT_HEADER: &str = "retrofit-context-header";

    /// Id of the document-level style slot
    pub const STYLE_SLOT: &str = "retrofit-style";
}

/// Fail-safe defaults for the reconciliation loop
pub mod failsafe {
    /// Consecutive no-op notifications tolerated before halting
    pub const MAX_IDLE_NOTIFICATIONS: u32 = 500;

    /// Reapplications tolerated before halting
    pub const MAX_APPLIED_UPDATES: u32 = 100;
}

/// Deferred "wait for element" retries
pub mod retry {
    /// Fixed delay between attempts in milliseconds
    pub const DELAY_MS: u64 = 250;

    /// Attempts per element before it is reported absent
    pub const MAX_ATTEMPTS: u32 = 40;
}

/// Validation bounds for user-editable tunables
pub mod validation {
    pub const MIN_IDLE_NOTIFICATIONS: u32 = 10;
    pub const MAX_IDLE_NOTIFICATIONS: u32 = 100_000;
    pub const MIN_APPLIED_UPDATES: u32 = 2;
    pub const MAX_APPLIED_UPDATES: u32 = 10_000;
    pub const MIN_RETRY_DELAY_MS: u64 = 10;
    pub const MAX_RETRY_DELAY_MS: u64 = 60_000;
    pub const MAX_RETRY_ATTEMPTS: u32 = 1_000;
}

/// Configuration file location
pub mod config {
    /// Application directory under the platform config dir
    pub const APP_DIR: &str = "retrofit";

    /// Settings document filename
    pub const FILENAME: &str = "settings.json";
}
