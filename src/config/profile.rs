//! Typed configuration tree
//!
//! The store holds raw JSON documents. They are validated for parity once and
//! then converted into these structs; nothing downstream looks up options by
//! string.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::constants::{failsafe, retry, validation};

/// Top-level mode selecting the active profile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Engine stays unsubscribed
    Disabled,
    /// Preset A: strips the interface down
    Minimal,
    /// Preset B: restores an older layout
    #[default]
    Classic,
    /// User-edited profile
    Custom,
}

impl Mode {
    /// Modes that carry a profile document
    pub const CONFIGURABLE: [Mode; 3] = [Mode::Minimal, Mode::Classic, Mode::Custom];

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Disabled => "disabled",
            Mode::Minimal => "minimal",
            Mode::Classic => "classic",
            Mode::Custom => "custom",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Mode::Disabled, Mode::Minimal, Mode::Classic, Mode::Custom]
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown mode '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub const ALL: [Theme; 2] = [Theme::Light, Theme::Dark];

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Theme::ALL
            .into_iter()
            .find(|theme| theme.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown theme '{s}'"))
    }
}

/// Options every region understands.
/// Unset options serialize as `null` so every profile keeps the same keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionSettings {
    pub remove: bool,
    pub align_left: bool,
    pub width: Option<String>,
    pub height: Option<String>,
    pub color: Option<String>,
    pub background: Option<String>,
    pub shadow: Option<String>,
    pub border_radius: Option<String>,
    /// Inline icon markup
    pub icon: Option<String>,
    pub text: Option<String>,
    pub hover_color: Option<String>,
    pub hover_background: Option<String>,
}

impl RegionSettings {
    /// True if any option asks for a change
    pub fn is_active(&self) -> bool {
        self.remove
            || self.align_left
            || [
                &self.width,
                &self.height,
                &self.color,
                &self.background,
                &self.shadow,
                &self.border_radius,
                &self.icon,
                &self.text,
                &self.hover_color,
                &self.hover_background,
            ]
            .iter()
            .any(|option| option.is_some())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MastheadSettings {
    #[serde(flatten)]
    pub base: RegionSettings,
    pub sticky: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogoSettings {
    #[serde(flatten)]
    pub base: RegionSettings,
    pub link_target: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    #[serde(flatten)]
    pub base: RegionSettings,
    pub placeholder: Option<String>,
    /// Swap visual order with voice search; wins over `align_left`
    pub swap_with_voice: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    #[serde(flatten)]
    pub base: RegionSettings,
    pub hide_badge: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuideSettings {
    #[serde(flatten)]
    pub base: RegionSettings,
    /// Wait for the deferred side panel and tag it once rendered
    pub preload: bool,
    pub compact: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChipsSettings {
    #[serde(flatten)]
    pub base: RegionSettings,
    /// Synthesize a header above the chips bar while it is visible
    pub context_header: bool,
    /// Fixed header text; the selected chip's text when unset
    pub header_text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TooltipSettings {
    #[serde(flatten)]
    pub base: RegionSettings,
    /// Host tooltip text -> replacement
    pub labels: BTreeMap<String, String>,
}

/// A complete set of region settings for one mode and theme
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    #[serde(skip)]
    pub mode: Mode,
    #[serde(skip)]
    pub theme: Theme,

    pub masthead: MastheadSettings,
    pub logo: LogoSettings,
    pub search: SearchSettings,
    pub voice_search: RegionSettings,
    pub create: RegionSettings,
    pub notifications: NotificationSettings,
    pub avatar: RegionSettings,
    pub apps: RegionSettings,
    pub guide: GuideSettings,
    pub chips: ChipsSettings,
    pub tooltips: TooltipSettings,
    pub subscribe: RegionSettings,
    pub title: RegionSettings,
}

impl Profile {
    /// Profile that applies nothing
    pub fn disabled(theme: Theme) -> Self {
        Self {
            mode: Mode::Disabled,
            theme,
            ..Self::default()
        }
    }

    /// Name written into the success marker, e.g. `classic-dark`
    pub fn name(&self) -> String {
        format!("{}-{}", self.mode, self.theme)
    }

    pub fn is_disabled(&self) -> bool {
        self.mode == Mode::Disabled
    }
}

/// Engine-wide tunables shared by every profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalSettings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_max_idle_notifications")]
    pub max_idle_notifications: u32,
    #[serde(default = "default_max_applied_updates")]
    pub max_applied_updates: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_idle_notifications() -> u32 {
    failsafe::MAX_IDLE_NOTIFICATIONS
}

fn default_max_applied_updates() -> u32 {
    failsafe::MAX_APPLIED_UPDATES
}

fn default_retry_delay_ms() -> u64 {
    retry::DELAY_MS
}

fn default_max_retry_attempts() -> u32 {
    retry::MAX_ATTEMPTS
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            max_idle_notifications: default_max_idle_notifications(),
            max_applied_updates: default_max_applied_updates(),
            retry_delay_ms: default_retry_delay_ms(),
            max_retry_attempts: default_max_retry_attempts(),
        }
    }
}

impl GlobalSettings {
    /// Validate and clamp tunables to safe ranges
    pub fn validate_and_clamp(&mut self) {
        use validation::*;

        if !matches!(
            self.log_level.as_str(),
            "silent" | "error" | "warn" | "info" | "debug" | "trace"
        ) {
            warn!(log_level = %self.log_level, using = %default_log_level(), "Unknown log_level, using default");
            self.log_level = default_log_level();
        }

        if self.max_idle_notifications < MIN_IDLE_NOTIFICATIONS {
            warn!(max_idle_notifications = self.max_idle_notifications, min = MIN_IDLE_NOTIFICATIONS, "max_idle_notifications below minimum, clamping");
            self.max_idle_notifications = MIN_IDLE_NOTIFICATIONS;
        } else if self.max_idle_notifications > MAX_IDLE_NOTIFICATIONS {
            warn!(max_idle_notifications = self.max_idle_notifications, max = MAX_IDLE_NOTIFICATIONS, "max_idle_notifications exceeds maximum, clamping");
            self.max_idle_notifications = MAX_IDLE_NOTIFICATIONS;
        }

        if self.max_applied_updates < MIN_APPLIED_UPDATES {
            warn!(max_applied_updates = self.max_applied_updates, min = MIN_APPLIED_UPDATES, "max_applied_updates below minimum, clamping");
            self.max_applied_updates = MIN_APPLIED_UPDATES;
        } else if self.max_applied_updates > MAX_APPLIED_UPDATES {
            warn!(max_applied_updates = self.max_applied_updates, max = MAX_APPLIED_UPDATES, "max_applied_updates exceeds maximum, clamping");
            self.max_applied_updates = MAX_APPLIED_UPDATES;
        }

        if self.retry_delay_ms < MIN_RETRY_DELAY_MS {
            warn!(retry_delay_ms = self.retry_delay_ms, min = MIN_RETRY_DELAY_MS, "retry_delay_ms below minimum, clamping");
            self.retry_delay_ms = MIN_RETRY_DELAY_MS;
        } else if self.retry_delay_ms > MAX_RETRY_DELAY_MS {
            warn!(retry_delay_ms = self.retry_delay_ms, max = MAX_RETRY_DELAY_MS, "retry_delay_ms exceeds maximum, clamping");
            self.retry_delay_ms = MAX_RETRY_DELAY_MS;
        }

        if self.max_retry_attempts == 0 {
            warn!(using = default_max_retry_attempts(), "max_retry_attempts is zero, using default");
            self.max_retry_attempts = default_max_retry_attempts();
        } else if self.max_retry_attempts > MAX_RETRY_ATTEMPTS {
            warn!(max_retry_attempts = self.max_retry_attempts, max = MAX_RETRY_ATTEMPTS, "max_retry_attempts exceeds maximum, clamping");
            self.max_retry_attempts = MAX_RETRY_ATTEMPTS;
        }
    }
}
