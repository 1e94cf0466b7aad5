//! Structural parity between profiles
//!
//! Every mode and theme must expose the same region and option keys. The
//! check runs on the raw document before any typed conversion, so a key
//! missing from one profile is reported instead of silently defaulted.

use serde_json::Value;
use std::collections::BTreeSet;
use thiserror::Error;

use super::profile::{Mode, Theme};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParityError {
    #[error("profiles document is not an object")]
    NotAnObject,

    #[error("profile '{0}' is missing")]
    MissingProfile(String),

    #[error("profile '{profile}' region '{region}' is not an object")]
    MalformedRegion { profile: String, region: String },

    #[error("profile '{profile}' differs from '{reference}': missing {missing:?}, extra {extra:?}")]
    Mismatch {
        reference: String,
        profile: String,
        missing: Vec<String>,
        extra: Vec<String>,
    },
}

/// `region` and `region.option` paths of one profile
fn key_paths(profile_name: &str, profile: &Value) -> Result<BTreeSet<String>, ParityError> {
    let regions = profile
        .as_object()
        .ok_or_else(|| ParityError::MissingProfile(profile_name.to_string()))?;

    let mut paths = BTreeSet::new();
    for (region, options) in regions {
        let options = options.as_object().ok_or_else(|| ParityError::MalformedRegion {
            profile: profile_name.to_string(),
            region: region.clone(),
        })?;
        paths.insert(region.clone());
        // Nested option values (tooltip labels) are user data, not structure
        paths.extend(options.keys().map(|option| format!("{region}.{option}")));
    }
    Ok(paths)
}

/// Check every configurable mode × theme against the first one
pub fn check(profiles: &Value) -> Result<(), ParityError> {
    if !profiles.is_object() {
        return Err(ParityError::NotAnObject);
    }

    let mut reference: Option<(String, BTreeSet<String>)> = None;
    for mode in Mode::CONFIGURABLE {
        for theme in Theme::ALL {
            let name = format!("{mode}.{theme}");
            let profile = profiles
                .get(mode.as_str())
                .and_then(|themes| themes.get(theme.as_str()))
                .ok_or_else(|| ParityError::MissingProfile(name.clone()))?;
            let paths = key_paths(&name, profile)?;

            match &reference {
                None => reference = Some((name, paths)),
                Some((reference_name, expected)) => {
                    if &paths != expected {
                        return Err(ParityError::Mismatch {
                            reference: reference_name.clone(),
                            profile: name,
                            missing: expected.difference(&paths).cloned().collect(),
                            extra: paths.difference(expected).cloned().collect(),
                        });
                    }
                }
            }
        }
    }
    Ok(())
}
