//! Still frames taken from videos.

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::command::FfmpegCommand;
use crate::future::{elapsed_since, FutureCell, FutureValue};

use super::error::MediaError;
use super::mime::MimeType;
use super::runner::ToolRunner;

/// Extension of extracted frame images.
pub const FRAME_EXTENSION: &str = "jpg";

/// Extracts a single frame from a video: probe the duration, pick a timestamp
/// from a ratio, then ask the tool for one frame at that timestamp.
pub struct VideoFrameProbe<R> {
    runner: Arc<R>,
}

impl<R> Clone for VideoFrameProbe<R> {
    fn clone(&self) -> Self {
        Self {
            runner: Arc::clone(&self.runner),
        }
    }
}

impl<R: ToolRunner + 'static> VideoFrameProbe<R> {
    pub fn new(runner: Arc<R>) -> Self {
        Self { runner }
    }

    /// Path of the image written for `video`: `<stem>.jpg` in the same directory.
    pub fn image_path(video: &Path) -> Result<PathBuf, MediaError> {
        let invalid = || MediaError::InvalidOutputPath {
            path: video.to_path_buf(),
        };
        let stem = video.file_stem().ok_or_else(invalid)?;
        let parent = video.parent().ok_or_else(invalid)?;
        let mut name = stem.to_os_string();
        name.push(".");
        name.push(FRAME_EXTENSION);
        Ok(parent.join(name))
    }

    /// Timestamp in milliseconds at `ratio` of `duration`. The ratio is clamped to `[0, 1]`.
    pub fn frame_time_ms(duration: std::time::Duration, ratio: f32) -> u64 {
        let ratio = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };
        (duration.as_millis() as f64 * ratio as f64).floor() as u64
    }

    /// Command that writes one frame of `video` at `time_ms` to `image`.
    pub fn extraction_command(video: &Path, image: &Path, time_ms: u64) -> FfmpegCommand {
        FfmpegCommand::new()
            .io(
                video.to_string_lossy(),
                Some(image.to_string_lossy()),
            )
            .frame_count(1)
            .start_time_ms(time_ms)
            .overwrite()
    }

    /// Extracts the frame and returns the image path.
    pub async fn extract(&self, video: &Path, ratio: f32) -> Result<PathBuf, MediaError> {
        let is_video = MimeType::from_path(video).is_some_and(|m| m.is_video());
        if !is_video {
            return Err(MediaError::NotAVideo {
                path: video.to_path_buf(),
            });
        }
        let image = Self::image_path(video)?;

        let duration = self.runner.probe_duration(video).await?;
        let time_ms = Self::frame_time_ms(duration, ratio);
        debug!(
            "Extracting frame of {} at {}ms of {:?}",
            video.display(),
            time_ms,
            duration
        );

        let command = Self::extraction_command(video, &image, time_ms);
        self.runner.execute(&command).await?;
        Ok(image)
    }

    /// Extracts a frame in the background and publishes its progress to `cell`.
    ///
    /// The cell is reset to `Pending` right away, moves to `Running` once the
    /// work starts, and ends `Finished` with the image path or `Failed` with
    /// the error of whichever step failed.
    pub fn post_video_frame(
        &self,
        video: impl Into<PathBuf>,
        ratio: f32,
        cell: FutureCell<PathBuf>,
    ) -> JoinHandle<()> {
        let video = video.into();
        cell.reset(FutureValue::pending_now());

        let probe = self.clone();
        tokio::spawn(async move {
            let started_at = Utc::now();
            let _ = cell.set(FutureValue::Running {
                cancel: None,
                started_at: Some(started_at),
            });

            let next = match probe.extract(&video, ratio).await {
                Ok(image) => FutureValue::Finished {
                    value: image,
                    started_at: Some(started_at),
                    runtime: Some(elapsed_since(started_at)),
                },
                Err(e) => {
                    warn!("Frame extraction failed for {}: {}", video.display(), e);
                    FutureValue::Failed {
                        error: Arc::new(e),
                        started_at: Some(started_at),
                        runtime: Some(elapsed_since(started_at)),
                    }
                }
            };
            let _ = cell.set(next);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::future::FutureKind;
    use crate::testing::MockToolRunner;
    use std::time::Duration;

    #[test]
    fn test_image_path_next_to_video() {
        let image = VideoFrameProbe::<MockToolRunner>::image_path(Path::new("/v/clip.mp4")).unwrap();
        assert_eq!(image, PathBuf::from("/v/clip.jpg"));
    }

    #[test]
    fn test_frame_time_clamps_ratio() {
        let d = Duration::from_millis(10_001);
        type P = VideoFrameProbe<MockToolRunner>;
        assert_eq!(P::frame_time_ms(d, 0.5), 5000);
        assert_eq!(P::frame_time_ms(d, -1.0), 0);
        assert_eq!(P::frame_time_ms(d, 7.0), 10_001);
        assert_eq!(P::frame_time_ms(d, f32::NAN), 0);
    }

    #[test]
    fn test_extraction_command() {
        let cmd = VideoFrameProbe::<MockToolRunner>::extraction_command(
            Path::new("/v/clip.mp4"),
            Path::new("/v/clip.jpg"),
            1500,
        );
        assert_eq!(
            cmd.to_string(),
            "ffmpeg -i /v/clip.mp4 /v/clip.jpg -vframes 1 -ss 0:0:1.500 -y"
        );
    }

    #[tokio::test]
    async fn test_extract_probes_then_executes() {
        let runner = Arc::new(MockToolRunner::new().with_duration(Duration::from_secs(4)));
        let probe = VideoFrameProbe::new(runner.clone());

        let image = probe.extract(Path::new("/v/clip.webm"), 0.25).await.unwrap();
        assert_eq!(image, PathBuf::from("/v/clip.jpg"));

        assert_eq!(runner.probes().await, vec![PathBuf::from("/v/clip.webm")]);
        let executed = runner.executed().await;
        assert_eq!(executed.len(), 1);
        assert!(executed[0].to_string().ends_with("-ss 0:0:1.0 -y"));
    }

    #[tokio::test]
    async fn test_repeated_extraction_overwrites_frame() {
        let runner = Arc::new(MockToolRunner::new());
        let probe = VideoFrameProbe::new(runner.clone());

        let first = probe.extract(Path::new("/v/clip.mp4"), 0.5).await.unwrap();
        let second = probe.extract(Path::new("/v/clip.mp4"), 0.2).await.unwrap();
        assert_eq!(first, second);

        let executed = runner.executed().await;
        assert_eq!(executed.len(), 2);
        for cmd in &executed {
            assert!(cmd.to_argv().contains(&"-y".to_string()));
        }
    }

    #[tokio::test]
    async fn test_non_video_fails_without_running_tool() {
        let runner = Arc::new(MockToolRunner::new());
        let probe = VideoFrameProbe::new(runner.clone());

        let result = probe.extract(Path::new("/v/photo.png"), 0.5).await;
        assert!(matches!(result, Err(MediaError::NotAVideo { .. })));
        assert!(runner.probes().await.is_empty());
    }

    #[tokio::test]
    async fn test_post_video_frame_publishes_lifecycle() {
        let runner = Arc::new(MockToolRunner::new());
        let probe = VideoFrameProbe::new(runner);
        let cell = FutureCell::default();

        probe
            .post_video_frame("/v/clip.mp4", 0.5, cell.clone())
            .await
            .unwrap();
        assert_eq!(cell.kind(), FutureKind::Finished);
        assert_eq!(cell.finished_value(), Some(PathBuf::from("/v/clip.jpg")));
    }

    #[tokio::test]
    async fn test_post_video_frame_publishes_failure() {
        let runner = Arc::new(MockToolRunner::new());
        runner.set_fail_probe(true).await;
        let probe = VideoFrameProbe::new(runner);
        let cell = FutureCell::default();

        probe
            .post_video_frame("/v/clip.mp4", 0.5, cell.clone())
            .await
            .unwrap();
        let state = cell.snapshot();
        assert_eq!(state.kind(), FutureKind::Failed);
        assert!(state.error().unwrap().to_string().contains("probe"));
    }
}
