//! The settings the converter remembers between runs.

use serde::{Deserialize, Serialize};

use crate::media::{MimeCategory, MimeType, Resolution};
use crate::units::{BitUnit, BitValue};

use super::store::{setting_key, JsonSetting, Setting};

/// Default video bitrate in kbit/s.
pub const DEFAULT_BIT_RATE: i32 = 1024;

/// Defaults for the remembered settings, overridable from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsConfig {
    /// Bitrate in kbit/s used until the user picks one.
    #[serde(default = "default_bit_rate")]
    pub bit_rate: i32,

    /// Maximum output size, e.g. `"10 GB"`.
    #[serde(default = "default_max_size")]
    pub max_size: BitValue,

    /// Output resolution, a preset name or `WxH`.
    #[serde(default)]
    pub resolution: Resolution,
}

fn default_bit_rate() -> i32 {
    DEFAULT_BIT_RATE
}

fn default_max_size() -> BitValue {
    BitValue::new(10.0, BitUnit::GIGABYTE)
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            bit_rate: default_bit_rate(),
            max_size: default_max_size(),
            resolution: Resolution::default(),
        }
    }
}

/// Setting definitions.
///
/// Holds only the defaults; values live in whichever store is passed to the
/// returned settings.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    config: SettingsConfig,
}

impl Settings {
    pub fn new(config: SettingsConfig) -> Self {
        Self { config }
    }

    /// Last output type picked for inputs of `from`'s category.
    ///
    /// The key is shared by the whole category; the default is the first
    /// type `from` can be converted into.
    pub fn last_output_mime(&self, from: MimeType) -> JsonSetting<MimeType> {
        let default = from
            .convertible_targets()
            .first()
            .copied()
            .unwrap_or(MimeType::Gif);
        JsonSetting::new(Self::output_mime_key(from.category()), default)
    }

    fn output_mime_key(category: MimeCategory) -> String {
        format!("LastSelectedMime_{}", setting_key(category.as_str()))
    }

    /// Last video bitrate in kbit/s.
    pub fn bit_rate(&self) -> Setting<i32> {
        Setting::new("LastBitRate", self.config.bit_rate)
    }

    /// Largest output file allowed.
    pub fn max_size(&self) -> JsonSetting<BitValue> {
        JsonSetting::new("MaxSize", self.config.max_size)
    }

    /// Output frame size.
    pub fn resolution(&self) -> JsonSetting<Resolution> {
        JsonSetting::new("Resolution", self.config.resolution)
    }
}
