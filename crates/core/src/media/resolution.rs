//! Output frame sizes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Width and height in pixels, rendered as `WxH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const QVGA: Resolution = Resolution::new(320, 240);
    pub const VGA: Resolution = Resolution::new(640, 480);
    pub const HD: Resolution = Resolution::new(1280, 720);
    pub const FHD: Resolution = Resolution::new(1920, 1080);
    pub const QHD: Resolution = Resolution::new(2560, 1440);
    pub const UHD: Resolution = Resolution::new(3840, 2160);

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Named presets, smallest first.
    pub fn presets() -> [(&'static str, Resolution); 6] {
        [
            ("qvga", Self::QVGA),
            ("vga", Self::VGA),
            ("hd", Self::HD),
            ("fhd", Self::FHD),
            ("qhd", Self::QHD),
            ("uhd", Self::UHD),
        ]
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::FHD
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = String;

    /// Parses a preset name (`fhd`) or explicit `WxH`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if let Some((_, preset)) = Self::presets().into_iter().find(|(name, _)| *name == s) {
            return Ok(preset);
        }
        let (w, h) = s
            .split_once('x')
            .ok_or_else(|| format!("Invalid resolution: {}", s))?;
        let width = w
            .parse::<u32>()
            .map_err(|_| format!("Invalid resolution width: {}", w))?;
        let height = h
            .parse::<u32>()
            .map_err(|_| format!("Invalid resolution height: {}", h))?;
        if width == 0 || height == 0 {
            return Err(format!("Resolution must be non zero: {}", s));
        }
        Ok(Self::new(width, height))
    }
}

impl From<Resolution> for String {
    fn from(value: Resolution) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for Resolution {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
