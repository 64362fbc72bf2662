//! Persisted user settings.
//!
//! Each [`Setting`] declares its key, type and default up front. Values are
//! read and written through a [`SettingsStore`] handle passed in by the
//! caller: [`SqliteSettingsStore`] on disk, or [`MemorySettingsStore`].

mod definitions;
mod memory;
mod sqlite;
mod store;
mod value;

pub use definitions::{Settings, SettingsConfig, DEFAULT_BIT_RATE};
pub use memory::MemorySettingsStore;
pub use sqlite::SqliteSettingsStore;
pub use store::{setting_key, JsonSetting, Setting, SettingsError, SettingsStore};
pub use value::{SettingKind, SettingType, SettingValue};
