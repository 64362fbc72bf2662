//! Command-line building.
//!
//! Commands are assembled as ordered argument lists rather than by string
//! concatenation, so re-setting an option (a bitrate chosen twice, say) replaces
//! it instead of duplicating it.

mod argument;
mod builder;
mod ffmpeg;

pub use argument::{Argument, ArgumentKey};
pub use builder::Command;
pub use ffmpeg::{format_duration, FfmpegCommand, FFMPEG_EXECUTABLE};
