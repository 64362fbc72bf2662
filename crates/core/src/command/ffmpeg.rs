//! FFmpeg argument vocabulary on top of [`Command`].

use serde::{Deserialize, Serialize};
use std::fmt;

use super::argument::{Argument, ArgumentKey};
use super::builder::Command;

/// Executable name used when no explicit path is configured.
pub const FFMPEG_EXECUTABLE: &str = "ffmpeg";

/// Builder for an ffmpeg invocation.
///
/// Every setter consumes and returns the builder, so a command is assembled in a
/// single expression. Setting the same option twice replaces the earlier value
/// without moving it.
///
/// ```
/// use flare_core::command::FfmpegCommand;
///
/// let cmd = FfmpegCommand::new()
///     .io("in.avi", Some("out.mp4"))
///     .speed_video_audio(2.0)
///     .duration_ms(1000);
/// assert_eq!(
///     cmd.to_string(),
///     "ffmpeg -i in.avi out.mp4 -vf setpts=2.0*PTS -af atempo=0.5 -t 0:0:1.0"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FfmpegCommand {
    command: Command,
}

impl Default for FfmpegCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegCommand {
    pub fn new() -> Self {
        Self {
            command: Command::new(FFMPEG_EXECUTABLE),
        }
    }

    /// Builds from existing arguments.
    pub fn with_args(args: impl IntoIterator<Item = Argument>) -> Self {
        Self {
            command: Command::with_args(FFMPEG_EXECUTABLE, args),
        }
    }

    fn arg<I, S>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command.arg(ArgumentKey::short(name), values);
        self
    }

    fn flag(self, name: &str) -> Self {
        self.arg(name, std::iter::empty::<String>())
    }

    /// The underlying generic command.
    pub fn command(&self) -> &Command {
        &self.command
    }

    /// Input file given to [`io`](Self::io), if any.
    pub fn input_path(&self) -> Option<&str> {
        self.io_value(0)
    }

    /// Output file given to [`io`](Self::io), if any.
    pub fn output_path(&self) -> Option<&str> {
        self.io_value(1)
    }

    fn io_value(&self, index: usize) -> Option<&str> {
        self.command
            .get(&ArgumentKey::short("i"))
            .and_then(|a| a.values.get(index))
            .map(|v| v.trim())
    }

    /// Arguments rendered without the executable name.
    pub fn args_only(&self) -> String {
        self.command.args_only()
    }

    /// Argument tokens for process spawning.
    pub fn to_argv(&self) -> Vec<String> {
        self.command.to_argv()
    }

    // ===== Arguments =====

    pub fn version(self) -> Self {
        self.flag("version")
    }

    pub fn help(self) -> Self {
        self.flag("h")
    }

    /// Input file, optionally followed by the output file.
    ///
    /// Both paths are values of the `-i` argument, which renders as `-i in out`.
    pub fn io(self, input: impl Into<String>, output: Option<impl Into<String>>) -> Self {
        let mut values = vec![input.into()];
        if let Some(output) = output {
            values.push(output.into());
        }
        self.arg("i", values)
    }

    /// Input file with no output, as used for probing.
    pub fn input(self, input: impl Into<String>) -> Self {
        self.io(input, None::<String>)
    }

    pub fn frame_count(self, value: u32) -> Self {
        self.arg("vframes", [value.to_string()])
    }

    pub fn frame_rate(self, value: u32) -> Self {
        self.arg("r", [value.to_string()])
    }

    pub fn sample_rate(self, value: u32) -> Self {
        self.arg("ar", [value.to_string()])
    }

    pub fn channels(self, value: u32) -> Self {
        self.arg("ac", [value.to_string()])
    }

    pub fn bitrate_overall(self, value: impl Into<String>) -> Self {
        self.arg("b", [value.into()])
    }

    pub fn bitrate_video(self, value: impl Into<String>) -> Self {
        self.arg("b:v", [value.into()])
    }

    pub fn bitrate_audio(self, value: impl Into<String>) -> Self {
        self.arg("b:a", [value.into()])
    }

    pub fn codec_video(self, codec: impl Into<String>) -> Self {
        self.arg("c:v", [codec.into()])
    }

    pub fn codec_audio(self, codec: impl Into<String>) -> Self {
        self.arg("c:a", [codec.into()])
    }

    /// Output frame size, rendered `WxH`.
    pub fn resolution(self, width: u32, height: u32) -> Self {
        self.arg("s", [format!("{}x{}", width, height)])
    }

    pub fn duration(self, value: impl Into<String>) -> Self {
        self.arg("t", [value.into()])
    }

    pub fn duration_ms(self, milliseconds: u64) -> Self {
        self.duration(format_duration(milliseconds))
    }

    pub fn format(self, value: impl Into<String>) -> Self {
        self.arg("f", [value.into()])
    }

    pub fn start_time(self, value: impl Into<String>) -> Self {
        self.arg("ss", [value.into()])
    }

    pub fn start_time_ms(self, milliseconds: u64) -> Self {
        self.start_time(format_duration(milliseconds))
    }

    pub fn end_time(self, value: impl Into<String>) -> Self {
        self.arg("to", [value.into()])
    }

    pub fn end_time_ms(self, milliseconds: u64) -> Self {
        self.end_time(format_duration(milliseconds))
    }

    pub fn filter_video(self, value: impl Into<String>) -> Self {
        self.arg("vf", [value.into()])
    }

    pub fn filter_audio(self, value: impl Into<String>) -> Self {
        self.arg("af", [value.into()])
    }

    pub fn scale(self, width: u32, height: u32) -> Self {
        self.filter_video(format!("scale={}:{}", width, height))
    }

    /// Presentation timestamp multiplier (`2.0` plays at half speed).
    pub fn speed(self, value: f32) -> Self {
        self.filter_video(format!("setpts={}*PTS", format_float(value)))
    }

    pub fn pitch(self, value: f32) -> Self {
        self.filter_audio(format!("atempo={}", format_float(value)))
    }

    /// Changes video speed and compensates the audio tempo.
    pub fn speed_video_audio(self, value: f32) -> Self {
        self.speed(value).pitch(1.0 / value)
    }

    pub fn metadata(self, value: impl Into<String>) -> Self {
        self.arg("metadata", [value.into()])
    }

    /// Metadata from key/value pairs, rendered `key="value"` and space separated.
    pub fn metadata_pairs<I, K, V>(self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: fmt::Display,
        V: fmt::Display,
    {
        let joined = pairs
            .into_iter()
            .map(|(k, v)| format!("{}=\"{}\"", k, v))
            .collect::<Vec<_>>()
            .join(" ");
        self.metadata(joined)
    }

    pub fn preset(self, value: impl Into<String>) -> Self {
        self.arg("preset", [value.into()])
    }

    pub fn crf(self, value: u32) -> Self {
        self.arg("crf", [value.to_string()])
    }

    /// Stops writing once the output reaches `bytes`.
    pub fn max_file_size(self, bytes: u64) -> Self {
        self.arg("fs", [bytes.to_string()])
    }

    pub fn hide_banner(self) -> Self {
        self.flag("hide_banner")
    }

    /// Overwrites the output file without asking.
    pub fn overwrite(self) -> Self {
        self.flag("y")
    }

    pub fn loglevel(self, level: impl Into<String>) -> Self {
        self.arg("loglevel", [level.into()])
    }
}

impl fmt::Display for FfmpegCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.command.fmt(f)
    }
}

impl From<FfmpegCommand> for Command {
    fn from(cmd: FfmpegCommand) -> Self {
        cmd.command
    }
}

/// Formats milliseconds as `H:M:S.mmm` without zero padding (`1000` → `0:0:1.0`).
pub fn format_duration(milliseconds: u64) -> String {
    let total_secs = milliseconds / 1000;
    let h = total_secs / 3600;
    let m = (total_secs % 3600) / 60;
    let s = total_secs % 60;
    let ms = milliseconds % 1000;
    format!("{}:{}:{}.{}", h, m, s, ms)
}

/// Whole numbers keep a trailing `.0`; everything else uses the shortest form.
fn format_float(value: f32) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_renders_executable() {
        assert_eq!(FfmpegCommand::new().to_string(), "ffmpeg");
    }

    #[test]
    fn test_speed_and_duration() {
        let cmd = FfmpegCommand::new()
            .io("in.avi", Some("out.mp4"))
            .speed_video_audio(2.0)
            .duration_ms(1000);
        assert_eq!(
            cmd.to_string(),
            "ffmpeg -i in.avi out.mp4 -vf setpts=2.0*PTS -af atempo=0.5 -t 0:0:1.0"
        );
    }

    #[test]
    fn test_format_duration_unpadded() {
        assert_eq!(format_duration(1000), "0:0:1.0");
        assert_eq!(format_duration(0), "0:0:0.0");
        assert_eq!(format_duration(3_723_045), "1:2:3.45");
        assert_eq!(format_duration(59_999), "0:0:59.999");
    }

    #[test]
    fn test_setting_twice_replaces() {
        let cmd = FfmpegCommand::new()
            .bitrate_video("1M")
            .codec_video("libx264")
            .bitrate_video("2M");
        assert_eq!(cmd.args_only(), "-b:v 2M -c:v libx264");
    }

    #[test]
    fn test_scale_and_speed_share_video_filter() {
        let cmd = FfmpegCommand::new().scale(640, 480).speed(1.5);
        assert_eq!(cmd.args_only(), "-vf setpts=1.5*PTS");
    }

    #[test]
    fn test_frame_extraction_vocabulary() {
        let cmd = FfmpegCommand::new()
            .io("/v/clip.mp4", Some("/v/clip.jpg"))
            .frame_count(1)
            .start_time_ms(61_500);
        assert_eq!(
            cmd.args_only(),
            "-i /v/clip.mp4 /v/clip.jpg -vframes 1 -ss 0:1:1.500"
        );
    }

    #[test]
    fn test_metadata_pairs() {
        let cmd = FfmpegCommand::new().metadata_pairs([("title", "Clip"), ("artist", "Me")]);
        assert_eq!(cmd.args_only(), r#"-metadata title="Clip" artist="Me""#);
    }

    #[test]
    fn test_flags_and_sizes() {
        let cmd = FfmpegCommand::new()
            .hide_banner()
            .overwrite()
            .resolution(1920, 1080)
            .max_file_size(1_000_000);
        assert_eq!(cmd.args_only(), "-hide_banner -y -s 1920x1080 -fs 1000000");
        assert_eq!(
            cmd.to_argv(),
            vec!["-hide_banner", "-y", "-s", "1920x1080", "-fs", "1000000"]
        );
    }

    #[test]
    fn test_input_only() {
        let cmd = FfmpegCommand::new().io("a.mp4", None::<String>);
        assert_eq!(cmd.args_only(), "-i a.mp4");
        assert_eq!(FfmpegCommand::new().input("a.mp4"), cmd);
        assert_eq!(cmd.input_path(), Some("a.mp4"));
        assert_eq!(cmd.output_path(), None);
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(2.0), "2.0");
        assert_eq!(format_float(0.5), "0.5");
        assert_eq!(format_float(1.25), "1.25");
    }
}
