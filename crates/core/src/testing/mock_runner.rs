//! Mock media tool for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::command::FfmpegCommand;
use crate::media::{MediaError, ToolOutput, ToolRunner};

/// Mock implementation of the ToolRunner trait.
///
/// Records every probe and command, returns configurable durations, and can be
/// told to fail. When an executed command names an output file whose directory
/// exists, a small placeholder file is written there.
///
/// # Example
///
/// ```rust,ignore
/// use flare_core::testing::MockToolRunner;
///
/// let runner = MockToolRunner::new().with_duration(Duration::from_secs(90));
/// runner.set_duration("/in/clip.mp4", Duration::from_secs(3)).await;
///
/// let probe = VideoFrameProbe::new(Arc::new(runner));
/// ```
#[derive(Debug)]
pub struct MockToolRunner {
    /// Paths passed to `probe_duration`.
    probes: Arc<RwLock<Vec<PathBuf>>>,
    /// Commands passed to `execute`.
    executed: Arc<RwLock<Vec<FfmpegCommand>>>,
    /// Durations by path.
    durations: Arc<RwLock<HashMap<PathBuf, Duration>>>,
    /// Duration reported for unknown paths.
    default_duration: Duration,
    /// Whether probes fail.
    fail_probe: Arc<RwLock<bool>>,
    /// If set, the next execution fails with this error.
    next_error: Arc<RwLock<Option<MediaError>>>,
    /// Simulated execution time.
    execution_delay: Arc<RwLock<Duration>>,
}

impl Default for MockToolRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl MockToolRunner {
    pub fn new() -> Self {
        Self {
            probes: Arc::new(RwLock::new(Vec::new())),
            executed: Arc::new(RwLock::new(Vec::new())),
            durations: Arc::new(RwLock::new(HashMap::new())),
            default_duration: Duration::from_secs(10),
            fail_probe: Arc::new(RwLock::new(false)),
            next_error: Arc::new(RwLock::new(None)),
            execution_delay: Arc::new(RwLock::new(Duration::ZERO)),
        }
    }

    /// Sets the duration reported for paths without an explicit one.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.default_duration = duration;
        self
    }

    /// Sets the duration reported for `path`.
    pub async fn set_duration(&self, path: impl AsRef<Path>, duration: Duration) {
        self.durations
            .write()
            .await
            .insert(path.as_ref().to_path_buf(), duration);
    }

    pub async fn set_fail_probe(&self, fail: bool) {
        *self.fail_probe.write().await = fail;
    }

    /// Configure the next execution to fail with the given error.
    pub async fn set_next_error(&self, error: MediaError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn set_execution_delay(&self, delay: Duration) {
        *self.execution_delay.write().await = delay;
    }

    /// Paths probed so far.
    pub async fn probes(&self) -> Vec<PathBuf> {
        self.probes.read().await.clone()
    }

    /// Commands executed so far.
    pub async fn executed(&self) -> Vec<FfmpegCommand> {
        self.executed.read().await.clone()
    }

    pub async fn clear_recorded(&self) {
        self.probes.write().await.clear();
        self.executed.write().await.clear();
    }
}

#[async_trait]
impl ToolRunner for MockToolRunner {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe_duration(&self, path: &Path) -> Result<Duration, MediaError> {
        self.probes.write().await.push(path.to_path_buf());
        if *self.fail_probe.read().await {
            return Err(MediaError::probe_failed(format!(
                "Mock probe failure for {}",
                path.display()
            )));
        }
        Ok(self
            .durations
            .read()
            .await
            .get(path)
            .copied()
            .unwrap_or(self.default_duration))
    }

    async fn execute(&self, command: &FfmpegCommand) -> Result<ToolOutput, MediaError> {
        let start = Instant::now();
        self.executed.write().await.push(command.clone());

        let delay = *self.execution_delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }

        if let Some(output) = command.output_path() {
            let output = Path::new(output);
            if output.parent().is_some_and(|p| p.is_dir()) {
                tokio::fs::write(output, b"mock output").await?;
            }
        }

        Ok(ToolOutput {
            argv: command.to_argv(),
            stderr: String::new(),
            elapsed: start.elapsed(),
        })
    }

    async fn validate(&self) -> Result<(), MediaError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_and_reports_durations() {
        let runner = MockToolRunner::new();
        runner.set_duration("/a.mp4", Duration::from_secs(3)).await;

        assert_eq!(
            runner.probe_duration(Path::new("/a.mp4")).await.unwrap(),
            Duration::from_secs(3)
        );
        assert_eq!(
            runner.probe_duration(Path::new("/b.mp4")).await.unwrap(),
            Duration::from_secs(10)
        );
        assert_eq!(runner.probes().await.len(), 2);
    }

    #[tokio::test]
    async fn test_next_error_applies_once() {
        let runner = MockToolRunner::new();
        runner
            .set_next_error(MediaError::tool_failed("boom", None))
            .await;
        let cmd = FfmpegCommand::new().version();

        assert!(runner.execute(&cmd).await.is_err());
        assert!(runner.execute(&cmd).await.is_ok());
        assert_eq!(runner.executed().await.len(), 2);
    }

    #[tokio::test]
    async fn test_writes_output_when_directory_exists() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.gif");
        let runner = MockToolRunner::new();
        let cmd = FfmpegCommand::new().io("in.mp4", Some(out.to_string_lossy()));

        runner.execute(&cmd).await.unwrap();
        assert!(out.exists());
    }
}
