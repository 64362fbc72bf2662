//! Supported media types and the conversions allowed between them.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

static MIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[a-z0-9]+/(\*|[a-z0-9\-+.]+)$").expect("mime pattern is valid")
});

/// Whether `value` looks like `category/name`, where name may be `*`.
pub fn is_mime_type(value: &str) -> bool {
    MIME_REGEX.is_match(value)
}

/// Splits a mime string into category and name.
pub fn mime_parts(value: &str) -> Option<(&str, &str)> {
    if !is_mime_type(value) {
        return None;
    }
    value.split_once('/')
}

/// Top-level media category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MimeCategory {
    Video,
    Image,
}

impl MimeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Image => "image",
        }
    }

    /// Wildcard mime for the whole category, e.g. `video/*`.
    pub fn wildcard(&self) -> &'static str {
        match self {
            Self::Video => "video/*",
            Self::Image => "image/*",
        }
    }
}

impl fmt::Display for MimeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MimeCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "video" => Ok(Self::Video),
            "image" => Ok(Self::Image),
            other => Err(format!("Unknown mime category: {}", other)),
        }
    }
}

/// A media type the converter knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum MimeType {
    Avi,
    Flv,
    Webm,
    Quicktime,
    Mpeg,
    Ogv,
    Wmv,
    Gif,
    Bmp,
    Tiff,
    Svg,
    Png,
    Apng,
    Jpeg,
}

/// Mime strings that are not in the catalogue but mean the same as an entry.
const ALIASES: &[(&str, MimeType)] = &[("video/mp4", MimeType::Quicktime)];

impl MimeType {
    pub const VIDEOS: [MimeType; 7] = [
        Self::Avi,
        Self::Flv,
        Self::Webm,
        Self::Quicktime,
        Self::Mpeg,
        Self::Ogv,
        Self::Wmv,
    ];

    pub const IMAGES: [MimeType; 7] = [
        Self::Gif,
        Self::Bmp,
        Self::Tiff,
        Self::Svg,
        Self::Png,
        Self::Apng,
        Self::Jpeg,
    ];

    /// Every catalogued type, videos first.
    pub fn all() -> impl Iterator<Item = MimeType> {
        Self::VIDEOS.into_iter().chain(Self::IMAGES)
    }

    /// Images a conversion can produce. Vector output is not supported.
    pub fn images_out() -> impl Iterator<Item = MimeType> {
        Self::IMAGES.into_iter().filter(|m| *m != Self::Svg)
    }

    /// Every type a conversion can produce.
    pub fn all_out() -> impl Iterator<Item = MimeType> {
        Self::VIDEOS.into_iter().chain(Self::images_out())
    }

    /// Types that move: every video, plus gif and apng.
    pub fn animated() -> impl Iterator<Item = MimeType> {
        Self::VIDEOS
            .into_iter()
            .chain([Self::Gif, Self::Apng])
    }

    pub fn category(&self) -> MimeCategory {
        if Self::VIDEOS.contains(self) {
            MimeCategory::Video
        } else {
            MimeCategory::Image
        }
    }

    /// Subtype after the slash.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Avi => "x-msvideo",
            Self::Flv => "x-flv",
            Self::Webm => "webm",
            Self::Quicktime => "quicktime",
            Self::Mpeg => "mpeg",
            Self::Ogv => "ogg",
            Self::Wmv => "x-ms-wmv",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
            Self::Svg => "svg+xml",
            Self::Png => "png",
            Self::Apng => "apng",
            Self::Jpeg => "jpeg",
        }
    }

    /// File extensions, preferred first.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Avi => &["avi"],
            Self::Flv => &["flv"],
            Self::Webm => &["webm"],
            Self::Quicktime => &["mp4", "mov"],
            Self::Mpeg => &["mpeg", "mpg"],
            Self::Ogv => &["ogg", "ogv"],
            Self::Wmv => &["wmv"],
            Self::Gif => &["gif"],
            Self::Bmp => &["bmp"],
            Self::Tiff => &["tiff"],
            Self::Svg => &["svg"],
            Self::Png => &["png"],
            Self::Apng => &["apng"],
            Self::Jpeg => &["jpeg", "jpg"],
        }
    }

    pub fn extension(&self) -> &'static str {
        self.extensions()[0]
    }

    /// Full mime string, e.g. `image/png`.
    pub fn mime(&self) -> String {
        format!("{}/{}", self.category(), self.name())
    }

    pub fn is_video(&self) -> bool {
        self.category() == MimeCategory::Video
    }

    /// Catalogue entry for a mime string, following aliases such as `video/mp4`.
    pub fn from_mime(value: &str) -> Option<MimeType> {
        let (category, name) = mime_parts(value)?;
        let category = category.to_ascii_lowercase();
        let name = name.to_ascii_lowercase();
        Self::all()
            .find(|m| m.category().as_str() == category && m.name() == name)
            .or_else(|| {
                let normalized = format!("{}/{}", category, name);
                ALIASES
                    .iter()
                    .find(|(alias, _)| *alias == normalized)
                    .map(|(_, m)| *m)
            })
    }

    /// Catalogue entry owning a file extension (case-insensitive, without the dot).
    pub fn from_extension(extension: &str) -> Option<MimeType> {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        Self::all().find(|m| m.extensions().contains(&extension.as_str()))
    }

    /// Catalogue entry for a file, judged by its extension.
    pub fn from_path(path: &Path) -> Option<MimeType> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Types this one may be converted into.
    pub fn convertible_targets(&self) -> Vec<MimeType> {
        match self {
            Self::Gif => Self::all_out().filter(|m| *m != Self::Gif).collect(),
            m if m.is_video() => Self::animated().filter(|t| t != m).collect(),
            m => Self::images_out().filter(|t| t != m).collect(),
        }
    }
}

/// Types a mime string may be converted into.
///
/// Accepts catalogue entries, their aliases, and the `video/*` and `image/*`
/// wildcards. Returns `None` for malformed or unsupported mime strings.
pub fn convertible_targets(mime: &str) -> Option<Vec<MimeType>> {
    if !is_mime_type(mime) {
        return None;
    }
    match mime.to_ascii_lowercase().as_str() {
        "video/*" => Some(MimeType::animated().collect()),
        "image/*" => Some(MimeType::images_out().collect()),
        _ => MimeType::from_mime(mime).map(|m| m.convertible_targets()),
    }
}

/// Preferred extension for a mime string, if it is known.
pub fn extension_from_mime(mime: &str) -> Option<&'static str> {
    let normalized = mime.to_ascii_lowercase();
    if normalized == "video/mp4" {
        return Some("mp4");
    }
    MimeType::from_mime(mime).map(|m| m.extension())
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category(), self.name())
    }
}

impl FromStr for MimeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_mime(s).ok_or_else(|| format!("Unsupported mime type: {}", s))
    }
}

impl From<MimeType> for String {
    fn from(value: MimeType) -> Self {
        value.mime()
    }
}

impl TryFrom<String> for MimeType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
