//! SQLite-backed settings store.

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::store::{SettingsError, SettingsStore};
use super::value::{SettingKind, SettingValue};

/// SQLite-backed settings store.
///
/// Each row keeps the value's kind next to its text form, so a value always
/// reads back with the type it was written with.
pub struct SqliteSettingsStore {
    conn: Mutex<Connection>,
}

impl SqliteSettingsStore {
    /// Opens (or creates) the database file and the settings table.
    pub fn new(path: &Path) -> Result<Self, SettingsError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SettingsError::Database(e.to_string()))?;
        }
        let conn = Connection::open(path).map_err(|e| SettingsError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, SettingsError> {
        let conn =
            Connection::open_in_memory().map_err(|e| SettingsError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), SettingsError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| SettingsError::Database(e.to_string()))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SettingsStore for SqliteSettingsStore {
    fn get_raw(&self, key: &str) -> Result<Option<SettingValue>, SettingsError> {
        let conn = self.lock();
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT kind, value FROM settings WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| SettingsError::Database(e.to_string()))?;

        let Some((kind, text)) = row else {
            return Ok(None);
        };
        let decode_error = |reason: String| SettingsError::Decode {
            key: key.to_string(),
            reason,
        };
        let kind = SettingKind::parse(&kind)
            .ok_or_else(|| decode_error(format!("unknown kind {}", kind)))?;
        SettingValue::from_text(kind, &text)
            .map(Some)
            .ok_or_else(|| decode_error(format!("invalid {} value {:?}", kind, text)))
    }

    fn set_raw(&self, key: &str, value: SettingValue) -> Result<(), SettingsError> {
        let conn = self.lock();
        conn.execute(
            r#"
            INSERT INTO settings (key, kind, value, updated_at) VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(key) DO UPDATE SET
                kind = excluded.kind,
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![
                key,
                value.kind().as_str(),
                value.to_text(),
                Utc::now().to_rfc3339()
            ],
        )
        .map_err(|e| SettingsError::Database(e.to_string()))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, SettingsError> {
        let conn = self.lock();
        let removed = conn
            .execute("DELETE FROM settings WHERE key = ?1", params![key])
            .map_err(|e| SettingsError::Database(e.to_string()))?;
        Ok(removed > 0)
    }

    fn clear(&self) -> Result<(), SettingsError> {
        let conn = self.lock();
        conn.execute("DELETE FROM settings", [])
            .map_err(|e| SettingsError::Database(e.to_string()))?;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, SettingsError> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare("SELECT key FROM settings ORDER BY key")
            .map_err(|e| SettingsError::Database(e.to_string()))?;
        let keys = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| SettingsError::Database(e.to_string()))?
            .collect::<Result<Vec<String>, _>>()
            .map_err(|e| SettingsError::Database(e.to_string()))?;
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Setting;

    fn create_test_store() -> SqliteSettingsStore {
        SqliteSettingsStore::in_memory().expect("Failed to create in-memory store")
    }

    #[test]
    fn test_get_missing() {
        let store = create_test_store();
        assert_eq!(store.get_raw("nothing").unwrap(), None);
    }

    #[test]
    fn test_set_get_replace() {
        let store = create_test_store();
        store.set_raw("rate", SettingValue::Int(1024)).unwrap();
        assert_eq!(store.get_raw("rate").unwrap(), Some(SettingValue::Int(1024)));

        store
            .set_raw("rate", SettingValue::String("fast".into()))
            .unwrap();
        assert_eq!(
            store.get_raw("rate").unwrap(),
            Some(SettingValue::String("fast".into()))
        );
        assert_eq!(store.keys().unwrap(), vec!["rate"]);
    }

    #[test]
    fn test_remove_and_clear() {
        let store = create_test_store();
        store.set_raw("a", SettingValue::Bool(false)).unwrap();
        store.set_raw("b", SettingValue::Double(1.5)).unwrap();

        assert!(store.remove("a").unwrap());
        assert!(!store.remove("a").unwrap());
        store.clear().unwrap();
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_row_reports_decode_error() {
        let store = create_test_store();
        store
            .lock()
            .execute(
                "INSERT INTO settings (key, kind, value, updated_at) VALUES ('x', 'int', 'abc', '')",
                [],
            )
            .unwrap();
        assert!(matches!(
            store.get_raw("x"),
            Err(SettingsError::Decode { .. })
        ));
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.db");
        let setting = Setting::new("LastBitRate", 1024i32);

        {
            let store = SqliteSettingsStore::new(&path).unwrap();
            setting.set(&store, 2048).unwrap();
        }

        let store = SqliteSettingsStore::new(&path).unwrap();
        assert_eq!(setting.get(&store).unwrap(), 2048);
    }
}
