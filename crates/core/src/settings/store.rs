//! Settings storage trait and typed setting definitions.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use super::value::{SettingKind, SettingType, SettingValue};

/// Errors that can occur while reading or writing settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Backend failure.
    #[error("Database error: {0}")]
    Database(String),

    /// Stored value has a different kind than the setting declares.
    #[error("Setting {key} holds a {found} value, expected {expected}")]
    TypeMismatch {
        key: String,
        expected: SettingKind,
        found: SettingKind,
    },

    /// Stored text cannot be read back as its declared kind.
    #[error("Setting {key} could not be decoded: {reason}")]
    Decode { key: String, reason: String },
}

/// Key/value storage for settings.
///
/// Implementations are explicitly constructed and passed to whoever needs
/// them; there is no process-wide store.
pub trait SettingsStore: Send + Sync {
    /// Returns the stored value, if any.
    fn get_raw(&self, key: &str) -> Result<Option<SettingValue>, SettingsError>;

    /// Stores a value, replacing any previous one.
    fn set_raw(&self, key: &str, value: SettingValue) -> Result<(), SettingsError>;

    /// Removes a value. Returns whether one was stored.
    fn remove(&self, key: &str) -> Result<bool, SettingsError>;

    /// Removes every value.
    fn clear(&self) -> Result<(), SettingsError>;

    /// Stored keys, sorted.
    fn keys(&self) -> Result<Vec<String>, SettingsError>;
}

/// Replaces every character outside `[a-zA-Z0-9_]` with `_`.
pub fn setting_key(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// A setting whose type and default are fixed at definition time.
#[derive(Debug, Clone)]
pub struct Setting<T> {
    key: String,
    default: T,
}

impl<T: SettingType> Setting<T> {
    pub fn new(key: impl Into<String>, default: T) -> Self {
        Self {
            key: key.into(),
            default,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }

    pub fn kind(&self) -> SettingKind {
        T::KIND
    }

    /// Stored value, or the default when nothing is stored.
    pub fn get(&self, store: &dyn SettingsStore) -> Result<T, SettingsError> {
        match store.get_raw(&self.key)? {
            None => Ok(self.default.clone()),
            Some(value) => {
                let found = value.kind();
                T::from_value(value).ok_or_else(|| SettingsError::TypeMismatch {
                    key: self.key.clone(),
                    expected: T::KIND,
                    found,
                })
            }
        }
    }

    pub fn set(&self, store: &dyn SettingsStore, value: T) -> Result<(), SettingsError> {
        store.set_raw(&self.key, value.into_value())
    }

    pub fn restore_default(&self, store: &dyn SettingsStore) -> Result<(), SettingsError> {
        self.set(store, self.default.clone())
    }
}

/// A setting holding a structured value, stored as a JSON string.
///
/// A stored value that no longer parses is replaced by the default on read.
#[derive(Debug, Clone)]
pub struct JsonSetting<T> {
    key: String,
    default: T,
}

impl<T> JsonSetting<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    pub fn new(key: impl Into<String>, default: T) -> Self {
        Self {
            key: key.into(),
            default,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }

    pub fn get(&self, store: &dyn SettingsStore) -> Result<T, SettingsError> {
        let raw = match store.get_raw(&self.key)? {
            None => return Ok(self.default.clone()),
            Some(SettingValue::String(raw)) => raw,
            Some(other) => {
                return Err(SettingsError::TypeMismatch {
                    key: self.key.clone(),
                    expected: SettingKind::String,
                    found: other.kind(),
                })
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(
                    "Resetting {} to default. Invalid json: {} ({})",
                    self.key, raw, e
                );
                self.restore_default(store)?;
                Ok(self.default.clone())
            }
        }
    }

    pub fn set(&self, store: &dyn SettingsStore, value: &T) -> Result<(), SettingsError> {
        let json = serde_json::to_string(value).map_err(|e| SettingsError::Decode {
            key: self.key.clone(),
            reason: e.to_string(),
        })?;
        store.set_raw(&self.key, SettingValue::String(json))
    }

    pub fn restore_default(&self, store: &dyn SettingsStore) -> Result<(), SettingsError> {
        self.set(store, &self.default.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemorySettingsStore;

    #[test]
    fn test_setting_key() {
        assert_eq!(setting_key("LastSelectedMime_video"), "LastSelectedMime_video");
        assert_eq!(setting_key("a/b c"), "a_b_c");
    }

    #[test]
    fn test_setting_default_then_set() {
        let store = MemorySettingsStore::new();
        let setting = Setting::new("Count", 5i32);
        assert_eq!(setting.get(&store).unwrap(), 5);

        setting.set(&store, 9).unwrap();
        assert_eq!(setting.get(&store).unwrap(), 9);

        setting.restore_default(&store).unwrap();
        assert_eq!(setting.get(&store).unwrap(), 5);
    }

    #[test]
    fn test_setting_type_mismatch() {
        let store = MemorySettingsStore::new();
        store
            .set_raw("Count", SettingValue::String("x".into()))
            .unwrap();
        let setting = Setting::new("Count", 5i32);
        assert!(matches!(
            setting.get(&store),
            Err(SettingsError::TypeMismatch {
                expected: SettingKind::Int,
                found: SettingKind::String,
                ..
            })
        ));
    }

    #[test]
    fn test_json_setting_resets_invalid_json() {
        let store = MemorySettingsStore::new();
        let setting = JsonSetting::new("Pair", vec![1u32, 2]);
        store
            .set_raw("Pair", SettingValue::String("{broken".into()))
            .unwrap();

        assert_eq!(setting.get(&store).unwrap(), vec![1, 2]);
        assert_eq!(
            store.get_raw("Pair").unwrap(),
            Some(SettingValue::String("[1,2]".into()))
        );
    }
}
