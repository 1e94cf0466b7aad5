//! Configuration management for retrofit
//!
//! This module provides:
//! - **store**: opaque key/value access to the persisted JSON document
//! - **parity**: structural check across every mode and theme
//! - **profile**: the typed tree built once the document passed the check
//! - **defaults**: compiled-in presets

pub mod defaults;
pub mod parity;
pub mod profile;
pub mod store;

pub use parity::ParityError;
pub use profile::{GlobalSettings, Mode, Profile, RegionSettings, Theme};
pub use store::{JsonFileStore, SettingsStore, get_or_default};
#[cfg(test)]
pub use store::MemoryStore;

use serde_json::Value;
use tracing::{error, info};

/// Everything read from the store at startup
#[derive(Debug, Clone)]
pub struct Settings {
    pub mode: Mode,
    pub theme: Theme,
    pub global: GlobalSettings,
    /// Parity-checked `profiles` document, kept for profile switches
    profiles: Value,
}

impl Settings {
    /// Read and validate settings. Unreadable values fall back to defaults;
    /// a parity mismatch between profiles is the only hard failure.
    pub fn from_store(store: &dyn SettingsStore) -> Result<Self, ParityError> {
        let mode = get_or_default(store, "mode", Mode::default());
        let theme = get_or_default(store, "theme", Theme::default());
        let mut global = get_or_default(store, "global", GlobalSettings::default());
        global.validate_and_clamp();

        let profiles = match store.get("profiles") {
            Ok(value) => value,
            Err(e) => {
                error!(error = %e.into_engine_error("profiles"), "Settings read failed, using default profiles");
                defaults::profiles_document()
            }
        };
        parity::check(&profiles)?;

        info!(mode = %mode, theme = %theme, "Settings validated");
        Ok(Self {
            mode,
            theme,
            global,
            profiles,
        })
    }

    /// Typed profile for any mode and theme
    pub fn profile(&self, mode: Mode, theme: Theme) -> Profile {
        if mode == Mode::Disabled {
            return Profile::disabled(theme);
        }
        let raw = self
            .profiles
            .get(mode.as_str())
            .and_then(|themes| themes.get(theme.as_str()))
            .cloned()
            .unwrap_or(Value::Null);

        match serde_json::from_value::<Profile>(raw) {
            Ok(mut profile) => {
                profile.mode = mode;
                profile.theme = theme;
                profile
            }
            Err(e) => {
                error!(mode = %mode, theme = %theme, error = %e, "Profile has invalid values, using defaults");
                defaults::profile(mode, theme)
            }
        }
    }

    /// Profile selected by the stored mode and theme
    #[cfg(test)]
    pub fn active_profile(&self) -> Profile {
        self.profile(self.mode, self.theme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_defaults() {
        let store = MemoryStore::with_defaults();
        let settings = Settings::from_store(&store).unwrap();
        let profile = settings.active_profile();
        assert_eq!(profile.name(), "classic-light");
        assert!(profile.search.swap_with_voice);
    }

    #[test]
    fn test_parity_mismatch_fails_fast() {
        let mut document = defaults::document();
        document["profiles"]["custom"]["light"]["title"]
            .as_object_mut()
            .unwrap()
            .remove("text");
        let store = MemoryStore::new(document);
        assert!(matches!(Settings::from_store(&store), Err(ParityError::Mismatch { .. })));
    }

    #[test]
    fn test_missing_profiles_fall_back_to_defaults() {
        let store = MemoryStore::new(json!({ "mode": "minimal", "theme": "dark" }));
        let settings = Settings::from_store(&store).unwrap();
        assert_eq!(settings.mode, Mode::Minimal);
        assert_eq!(settings.global, GlobalSettings::default());
        assert!(settings.active_profile().voice_search.remove);
    }

    #[test]
    fn test_invalid_profile_values_use_preset() {
        let mut document = defaults::document();
        document["profiles"]["classic"]["dark"]["search"]["swap_with_voice"] = json!("sometimes");
        // Same keys, wrong type: parity holds, conversion falls back
        let store = MemoryStore::new(document);
        let settings = Settings::from_store(&store).unwrap();
        let profile = settings.profile(Mode::Classic, Theme::Dark);
        assert_eq!(profile, defaults::profile(Mode::Classic, Theme::Dark));
    }

    #[test]
    fn test_disabled_mode() {
        let store = MemoryStore::new(json!({ "mode": "disabled" }));
        let settings = Settings::from_store(&store).unwrap();
        assert!(settings.active_profile().is_disabled());
    }
}
