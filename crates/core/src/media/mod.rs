//! Media handling on top of the external conversion tool.
//!
//! The tool itself is driven through [`ToolRunner`]; [`FfmpegRunner`] spawns
//! the real binaries. [`VideoFrameProbe`] extracts preview frames, and
//! [`MimeType`] describes which formats may be converted into which.

mod config;
mod error;
mod frame;
mod mime;
mod resolution;
mod runner;

pub use config::ToolConfig;
pub use error::MediaError;
pub use frame::{VideoFrameProbe, FRAME_EXTENSION};
pub use mime::{
    convertible_targets, extension_from_mime, is_mime_type, mime_parts, MimeCategory, MimeType,
};
pub use resolution::Resolution;
pub use runner::{FfmpegRunner, ToolOutput, ToolRunner};
