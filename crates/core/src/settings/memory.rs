//! In-memory settings store.

use std::collections::BTreeMap;
use std::sync::Mutex;

use super::store::{SettingsError, SettingsStore};
use super::value::SettingValue;

/// Settings store that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: Mutex<BTreeMap<String, SettingValue>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get_raw(&self, key: &str) -> Result<Option<SettingValue>, SettingsError> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set_raw(&self, key: &str, value: SettingValue) -> Result<(), SettingsError> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, SettingsError> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.remove(key).is_some())
    }

    fn clear(&self) -> Result<(), SettingsError> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, SettingsError> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_operations() {
        let store = MemorySettingsStore::new();
        store.set_raw("b", SettingValue::Int(1)).unwrap();
        store.set_raw("a", SettingValue::Bool(true)).unwrap();

        assert_eq!(store.keys().unwrap(), vec!["a", "b"]);
        assert!(store.remove("a").unwrap());
        assert!(!store.remove("a").unwrap());

        store.clear().unwrap();
        assert!(store.keys().unwrap().is_empty());
    }
}
