//! Invocation of the external media tool.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::command::{ArgumentKey, FfmpegCommand};
use crate::metrics;

use super::config::ToolConfig;
use super::error::MediaError;

/// What a finished tool invocation left behind.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Arguments the tool was started with.
    pub argv: Vec<String>,
    /// Captured standard error.
    pub stderr: String,
    pub elapsed: Duration,
}

/// Runs the external media tool.
///
/// Only two capabilities are needed: probing a file's duration, and executing a
/// built [`FfmpegCommand`].
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Returns the name of this runner.
    fn name(&self) -> &str;

    /// Returns the playback duration of a media file.
    async fn probe_duration(&self, path: &Path) -> Result<Duration, MediaError>;

    /// Executes a command and waits for it to exit.
    async fn execute(&self, command: &FfmpegCommand) -> Result<ToolOutput, MediaError>;

    /// Checks that the tool is installed and runnable.
    async fn validate(&self) -> Result<(), MediaError>;
}

/// [`ToolRunner`] backed by the ffmpeg and ffprobe binaries.
pub struct FfmpegRunner {
    config: ToolConfig,
}

impl FfmpegRunner {
    pub fn new(config: ToolConfig) -> Self {
        Self { config }
    }

    /// Creates a runner with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ToolConfig::default())
    }

    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    /// Process arguments for a command.
    ///
    /// A command renders its output as the second value of `-i`. The process
    /// gets the input with `-i` and the output as the final token, so options
    /// apply to the output file. The configured log level is added unless the
    /// command sets its own.
    fn process_args(&self, command: &FfmpegCommand) -> Vec<String> {
        let input_key = ArgumentKey::short("i");
        let loglevel_key = ArgumentKey::short("loglevel");

        let mut args = Vec::new();
        if command.command().get(&loglevel_key).is_none() {
            args.extend(["-loglevel".to_string(), self.config.log_level.clone()]);
        }

        let mut outputs = Vec::new();
        for argument in command.command().args() {
            if argument.key == input_key && argument.values.len() > 1 {
                args.push(argument.key.to_string());
                args.push(argument.values[0].trim().to_string());
                outputs.extend(argument.values[1..].iter().map(|v| v.trim().to_string()));
            } else {
                args.extend(argument.tokens());
            }
        }
        args.extend(outputs);
        args
    }

    fn map_spawn_error(e: std::io::Error, path: &Path) -> MediaError {
        if e.kind() == std::io::ErrorKind::NotFound {
            MediaError::ToolNotFound {
                path: path.to_path_buf(),
            }
        } else {
            MediaError::Io(e)
        }
    }

    /// Parses the format duration out of ffprobe JSON output.
    fn parse_probe_output(output: &str) -> Result<Duration, MediaError> {
        #[derive(Deserialize)]
        struct ProbeOutput {
            format: ProbeFormat,
        }

        #[derive(Deserialize)]
        struct ProbeFormat {
            duration: Option<String>,
        }

        let probe: ProbeOutput = serde_json::from_str(output)
            .map_err(|e| MediaError::probe_failed(format!("Failed to parse ffprobe output: {}", e)))?;

        let secs = probe
            .format
            .duration
            .as_deref()
            .and_then(|d| d.trim().parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d >= 0.0)
            .ok_or_else(|| MediaError::probe_failed("No duration reported"))?;

        Duration::try_from_secs_f64(secs)
            .map_err(|e| MediaError::probe_failed(format!("Invalid duration {}: {}", secs, e)))
    }

    async fn check_binary(path: &Path) -> Result<(), MediaError> {
        Command::new(path)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| Self::map_spawn_error(e, path))?;
        Ok(())
    }
}

#[async_trait]
impl ToolRunner for FfmpegRunner {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn probe_duration(&self, path: &Path) -> Result<Duration, MediaError> {
        if !path.exists() {
            return Err(MediaError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let output = Command::new(&self.config.ffprobe_path)
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(path)
            .output()
            .await
            .map_err(|e| Self::map_spawn_error(e, &self.config.ffprobe_path))?;

        if !output.status.success() {
            metrics::TOOL_INVOCATIONS
                .with_label_values(&["probe", "failed"])
                .inc();
            return Err(MediaError::probe_failed(format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let duration = Self::parse_probe_output(&String::from_utf8_lossy(&output.stdout));
        let result = if duration.is_ok() { "success" } else { "failed" };
        metrics::TOOL_INVOCATIONS
            .with_label_values(&["probe", result])
            .inc();
        duration
    }

    async fn execute(&self, command: &FfmpegCommand) -> Result<ToolOutput, MediaError> {
        let start = Instant::now();
        let argv = self.process_args(command);
        debug!("Running {} {}", self.config.ffmpeg_path.display(), argv.join(" "));

        let child = Command::new(&self.config.ffmpeg_path)
            .args(&argv)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Self::map_spawn_error(e, &self.config.ffmpeg_path))?;

        let limit = Duration::from_secs(self.config.timeout_secs);
        let output = match timeout(limit, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                // Dropping the future kills the child.
                warn!("ffmpeg timed out after {:?}", limit);
                metrics::TOOL_INVOCATIONS
                    .with_label_values(&["execute", "timeout"])
                    .inc();
                return Err(MediaError::Timeout(limit));
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            metrics::TOOL_INVOCATIONS
                .with_label_values(&["execute", "failed"])
                .inc();
            return Err(MediaError::tool_failed(
                format!("ffmpeg exited with code: {:?}", output.status.code()),
                if stderr.is_empty() { None } else { Some(stderr) },
            ));
        }

        metrics::TOOL_INVOCATIONS
            .with_label_values(&["execute", "success"])
            .inc();
        Ok(ToolOutput {
            argv,
            stderr,
            elapsed: start.elapsed(),
        })
    }

    async fn validate(&self) -> Result<(), MediaError> {
        Self::check_binary(&self.config.ffmpeg_path).await?;
        Self::check_binary(&self.config.ffprobe_path).await?;
        Ok(())
    }
}
