//! Settings store
//!
//! Opaque key/value access to the persisted settings document. Keys are
//! dotted paths (`profiles.custom.dark.search.width`). Only keys that already
//! exist can be written, which keeps every profile structurally identical.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

use super::defaults;
use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("unknown key '{0}'")]
    UnknownKey(String),

    #[error("key '{key}' expects {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    #[error("failed to write settings: {0}")]
    Write(String),
}

impl StoreError {
    pub fn into_engine_error(self, key: &str) -> EngineError {
        EngineError::Persistence {
            key: key.to_string(),
            reason: self.to_string(),
        }
    }
}

pub trait SettingsStore {
    fn get(&self, key: &str) -> Result<Value, StoreError>;
    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError>;
    fn save(&mut self) -> Result<(), StoreError>;
}

/// Read a typed value; any failure is logged and the default substituted
pub fn get_or_default<T: DeserializeOwned>(store: &dyn SettingsStore, key: &str, default: T) -> T {
    let value = match store.get(key) {
        Ok(value) => value,
        Err(e) => {
            error!(error = %e.into_engine_error(key), "Settings read failed, using default");
            return default;
        }
    };
    match serde_json::from_value(value) {
        Ok(typed) => typed,
        Err(e) => {
            error!(key = %key, error = %e, "Stored value has the wrong shape, using default");
            default
        }
    }
}

fn lookup<'a>(document: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.').try_fold(document, |node, part| node.get(part))
}

fn lookup_mut<'a>(document: &'a mut Value, key: &str) -> Option<&'a mut Value> {
    key.split('.').try_fold(document, |node, part| node.get_mut(part))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Replace the value at `key`. Optional options (`null`) accept strings.
fn write(document: &mut Value, key: &str, value: Value) -> Result<(), StoreError> {
    let slot = lookup_mut(document, key).ok_or_else(|| StoreError::UnknownKey(key.to_string()))?;
    let compatible = match (&*slot, &value) {
        (Value::Null, Value::String(_) | Value::Null) => true,
        (Value::String(_), Value::Null) => true,
        (current, new) => std::mem::discriminant(current) == std::mem::discriminant(new),
    };
    if !compatible {
        return Err(StoreError::TypeMismatch {
            key: key.to_string(),
            expected: kind(slot),
        });
    }
    *slot = value;
    Ok(())
}

/// JSON document under the platform config directory
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    document: Value,
}

impl JsonFileStore {
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(crate::constants::config::APP_DIR);
        path.push(crate::constants::config::FILENAME);
        path
    }

    /// Load the document, creating it with defaults when missing
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            info!(path = %path.display(), "Settings file not found, creating defaults");
            let mut store = Self {
                path,
                document: defaults::document(),
            };
            store.persist()?;
            return Ok(store);
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let document: Value = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings JSON from {}", path.display()))?;
        if !document.is_object() {
            warn!(path = %path.display(), "Settings document is not an object");
        }
        info!(path = %path.display(), "Loaded settings");
        Ok(Self { path, document })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }
        let contents = serde_json::to_string_pretty(&self.document)
            .context("Failed to serialize settings to JSON")?;
        fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write settings file to {}", self.path.display()))?;
        Ok(())
    }
}

impl SettingsStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Value, StoreError> {
        lookup(&self.document, key)
            .cloned()
            .ok_or_else(|| StoreError::UnknownKey(key.to_string()))
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        write(&mut self.document, key, value)
    }

    fn save(&mut self) -> Result<(), StoreError> {
        self.persist().map_err(|e| StoreError::Write(format!("{e:#}")))
    }
}

/// In-memory store; `save` is a no-op unless told to fail
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct MemoryStore {
    document: Value,
    pub fail_saves: bool,
    pub saves: usize,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new(document: Value) -> Self {
        Self {
            document,
            fail_saves: false,
            saves: 0,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(defaults::document())
    }
}

#[cfg(test)]
impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Value, StoreError> {
        lookup(&self.document, key)
            .cloned()
            .ok_or_else(|| StoreError::UnknownKey(key.to_string()))
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        write(&mut self.document, key, value)
    }

    fn save(&mut self) -> Result<(), StoreError> {
        if self.fail_saves {
            return Err(StoreError::Write("store is read-only".to_string()));
        }
        self.saves += 1;
        Ok(())
    }
}
