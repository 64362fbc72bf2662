//! Command-line argument structures.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use flare_core::{BitValue, MimeType, Resolution};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Flare: convert shared videos and images with ffmpeg",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file. Defaults to `flare.toml` when present.
    #[arg(long, global = true, value_name = "PATH", env = "FLARE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Print Prometheus metrics after the command finishes.
    #[arg(long, global = true, default_value_t = false)]
    pub print_metrics: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Lists supported types, or what one type converts into
    Formats(FormatsArgs),
    /// Extracts a preview frame from a video
    Frame(FrameArgs),
    /// Converts a file into another type
    Convert(ConvertArgs),
    /// Empties the input and output directories
    Clean(CleanArgs),
    /// Checks that ffmpeg and ffprobe can be run
    Check,
    /// Prints the effective configuration as JSON
    Config,
}

#[derive(Parser, Debug)]
pub struct FormatsArgs {
    /// Mime type to list conversion targets for, e.g. `video/mp4` or `image/*`
    #[arg(long, value_name = "MIME")]
    pub from: Option<String>,
}

#[derive(Parser, Debug)]
pub struct FrameArgs {
    /// Video to extract the frame from
    #[arg(value_name = "VIDEO")]
    pub video: PathBuf,

    /// Position in the video, from 0.0 (start) to 1.0 (end)
    #[arg(long, default_value_t = 0.5)]
    pub ratio: f32,
}

#[derive(Parser, Debug)]
pub struct ConvertArgs {
    /// File to convert
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Target mime type. Defaults to the last one picked for this kind of input.
    #[arg(short, long, value_name = "MIME")]
    pub to: Option<MimeType>,

    /// Mime type of the input, when its extension is missing or misleading
    #[arg(long, value_name = "MIME")]
    pub mime: Option<String>,

    /// Video bitrate in kbit/s
    #[arg(long, value_name = "KBPS")]
    pub bitrate: Option<u32>,

    /// Output resolution, a preset (`hd`, `fhd`, ...) or `WxH`
    #[arg(long, value_name = "RESOLUTION")]
    pub resolution: Option<Resolution>,

    /// Maximum output size, e.g. `25 MB`
    #[arg(long, value_name = "SIZE")]
    pub max_size: Option<BitValue>,

    /// Remember the target and options for next time
    #[arg(long, default_value_t = false)]
    pub remember: bool,

    /// Copy the result to this directory
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct CleanArgs {
    /// Only empty the input directory
    #[arg(long, conflicts_with = "output_only")]
    pub input_only: bool,

    /// Only empty the output directory
    #[arg(long)]
    pub output_only: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_convert() {
        let cli = Cli::try_parse_from([
            "flare",
            "convert",
            "clip.mp4",
            "--to",
            "image/gif",
            "--resolution",
            "hd",
            "--max-size",
            "25 MB",
        ])
        .unwrap();
        let Commands::Convert(args) = cli.command else {
            panic!("Expected convert command");
        };
        assert_eq!(args.to, Some(MimeType::Gif));
        assert_eq!(args.resolution, Some(Resolution::HD));
        assert_eq!(args.max_size.unwrap().to_string(), "25 MB");
        assert!(!args.remember);
    }

    #[test]
    fn test_parse_rejects_unknown_mime() {
        let result = Cli::try_parse_from(["flare", "convert", "clip.mp4", "--to", "text/plain"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_print_metrics_is_global_flag() {
        let cli = Cli::try_parse_from(["flare", "formats", "--print-metrics"]).unwrap();
        assert!(cli.print_metrics);
        assert!(Cli::try_parse_from(["flare", "metrics"]).is_err());
    }

    #[test]
    fn test_clean_flags_conflict() {
        let result = Cli::try_parse_from(["flare", "clean", "--input-only", "--output-only"]);
        assert!(result.is_err());
    }
}
