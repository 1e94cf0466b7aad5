//! Compiled-in presets
//!
//! Used for the default settings document and whenever a stored value
//! cannot be read.

use serde_json::{Map, Value, json};

use super::profile::{GlobalSettings, Mode, Profile, RegionSettings, Theme};

/// Magnifier glyph used by the classic search button
const CLASSIC_SEARCH_ICON: &str = r#"<svg viewBox="0 0 24 24" width="20" height="20"><path d="M15.5 14h-.8l-.3-.3A6.5 6.5 0 1 0 14 15.5l.3.3v.8l5 5 1.5-1.5-5-5z"/></svg>"#;

struct Palette {
    surface: &'static str,
    text: &'static str,
    accent: &'static str,
    hover: &'static str,
}

fn palette(theme: Theme) -> Palette {
    match theme {
        Theme::Light => Palette {
            surface: "#ffffff",
            text: "#0f0f0f",
            accent: "#cc0000",
            hover: "#f2f2f2",
        },
        Theme::Dark => Palette {
            surface: "#212121",
            text: "#f1f1f1",
            accent: "#ff4e45",
            hover: "#3d3d3d",
        },
    }
}

fn removed() -> RegionSettings {
    RegionSettings {
        remove: true,
        ..RegionSettings::default()
    }
}

/// Default profile for a mode and theme
pub fn profile(mode: Mode, theme: Theme) -> Profile {
    let mut profile = match mode {
        Mode::Disabled => return Profile::disabled(theme),
        Mode::Minimal => minimal(theme),
        Mode::Classic => classic(theme),
        Mode::Custom => Profile::default(),
    };
    profile.mode = mode;
    profile.theme = theme;
    profile
}

fn minimal(theme: Theme) -> Profile {
    let colors = palette(theme);
    let mut profile = Profile::default();

    profile.masthead.base.shadow = Some("none".to_string());
    profile.masthead.base.background = Some(colors.surface.to_string());
    profile.voice_search = removed();
    profile.create = removed();
    profile.apps = removed();
    profile.notifications.hide_badge = true;
    profile.guide.compact = true;
    profile.chips.base = removed();
    profile.search.base.width = Some("480px".to_string());
    profile.search.base.align_left = true;
    profile
}

fn classic(theme: Theme) -> Profile {
    let colors = palette(theme);
    let mut profile = Profile::default();

    profile.masthead.sticky = true;
    profile.masthead.base.background = Some(colors.surface.to_string());
    profile.masthead.base.shadow = Some("0 1px 2px rgba(0, 0, 0, 0.1)".to_string());

    profile.logo.link_target = Some("/feed/subscriptions".to_string());

    profile.search.placeholder = Some("Search".to_string());
    profile.search.swap_with_voice = true;
    profile.search.base.height = Some("32px".to_string());
    profile.search.base.border_radius = Some("2px".to_string());
    profile.search.base.icon = Some(CLASSIC_SEARCH_ICON.to_string());

    profile.create.text = Some("Upload".to_string());
    profile.create.hover_background = Some(colors.hover.to_string());

    profile.avatar.border_radius = Some("0".to_string());

    profile.guide.preload = true;

    profile.chips.context_header = true;

    profile.tooltips.labels.insert("Create".to_string(), "Upload".to_string());
    profile.tooltips.labels.insert("Notifications".to_string(), "Inbox".to_string());

    profile.subscribe.background = Some(colors.accent.to_string());
    profile.subscribe.color = Some("#ffffff".to_string());
    profile.subscribe.border_radius = Some("2px".to_string());
    profile.subscribe.text = Some("Subscribe".to_string());
    profile.subscribe.hover_background = Some(colors.accent.to_string());

    profile.title.color = Some(colors.text.to_string());
    profile.title.height = Some("auto".to_string());
    profile
}

/// `profiles` document: mode -> theme -> profile
pub fn profiles_document() -> Value {
    let mut modes = Map::new();
    for mode in Mode::CONFIGURABLE {
        let mut themes = Map::new();
        for theme in Theme::ALL {
            // Profile serialization cannot fail: string keys, no custom impls
            let value = serde_json::to_value(profile(mode, theme)).unwrap_or(Value::Null);
            themes.insert(theme.as_str().to_string(), value);
        }
        modes.insert(mode.as_str().to_string(), Value::Object(themes));
    }
    Value::Object(modes)
}

/// Whole default settings document
pub fn document() -> Value {
    json!({
        "mode": Mode::default(),
        "theme": Theme::default(),
        "global": GlobalSettings::default(),
        "profiles": profiles_document(),
    })
}
