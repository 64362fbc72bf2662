//! A conversion session: import a shared file, preview it, convert it.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::command::FfmpegCommand;
use crate::files::{AppDirs, FilesError};
use crate::future::{FutureCell, FutureValue, SharedError};
use crate::media::{MediaError, MimeType, Resolution, ToolRunner, VideoFrameProbe};
use crate::metrics;
use crate::queue::{
    BoxError, PatientTaskListener, PatientTaskQueue, QueueError, TaskDone, TaskError, TaskFinally,
    TaskStart, TaskStop, TaskTimeout,
};
use crate::settings::{Settings, SettingsError, SettingsStore};
use crate::share::{ShareError, ShareInfo, ShareRequest};
use crate::units::BitValue;

/// Ratio into the video used for the first preview frame.
pub const DEFAULT_PREVIEW_RATIO: f32 = 0.5;

/// Errors surfaced by a conversion session.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error(transparent)]
    Share(#[from] ShareError),

    #[error(transparent)]
    Files(#[from] FilesError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// No input has been imported yet.
    #[error("Invalid input file: nothing imported")]
    NotImported,

    /// The imported file cannot be converted into the requested type.
    #[error("Cannot convert {from} to {to}")]
    UnsupportedTarget { from: String, to: MimeType },

    /// The conversion ran past its timeout.
    #[error("Conversion timed out after {0:?}")]
    Timeout(Duration),

    /// The conversion was stopped.
    #[error("Conversion cancelled")]
    Cancelled,

    /// The tool reported an error.
    #[error("Conversion failed: {0}")]
    Failed(SharedError),
}

/// Encoding options applied on top of the plain input/output command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionOptions {
    /// Video bitrate in kbit/s. Ignored for still image targets.
    pub bitrate_kbps: Option<u32>,
    pub resolution: Option<Resolution>,
    /// Maximum output size.
    pub max_size: Option<BitValue>,
}

impl ConversionOptions {
    /// Options taken from the remembered settings.
    pub fn from_settings(
        settings: &Settings,
        store: &dyn SettingsStore,
    ) -> Result<Self, SettingsError> {
        let bit_rate = settings.bit_rate().get(store)?;
        Ok(Self {
            bitrate_kbps: u32::try_from(bit_rate).ok().filter(|b| *b > 0),
            resolution: Some(settings.resolution().get(store)?),
            max_size: Some(settings.max_size().get(store)?),
        })
    }

    pub fn with_bitrate_kbps(mut self, kbps: u32) -> Self {
        self.bitrate_kbps = Some(kbps);
        self
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = Some(resolution);
        self
    }

    pub fn with_max_size(mut self, max_size: BitValue) -> Self {
        self.max_size = Some(max_size);
        self
    }
}

/// Builds the command converting `input` into `output` as `target`.
pub fn conversion_command(
    input: &Path,
    output: &Path,
    target: MimeType,
    options: &ConversionOptions,
) -> FfmpegCommand {
    let mut command = FfmpegCommand::new()
        .hide_banner()
        .overwrite()
        .io(input.to_string_lossy(), Some(output.to_string_lossy()));

    if let Some(kbps) = options.bitrate_kbps.filter(|_| target.is_video()) {
        command = command.bitrate_video(format!("{}k", kbps));
    }
    if let Some(resolution) = options.resolution {
        command = command.resolution(resolution.width, resolution.height);
    }
    if let Some(max_size) = options.max_size {
        let bytes = max_size.whole_bytes();
        if bytes > 0 {
            command = command.max_file_size(bytes);
        }
    }
    command
}

/// Mirrors the most recently submitted conversion into the output cell, and
/// records conversion metrics for every conversion.
struct OutputTracker {
    cell: FutureCell<PathBuf>,
    latest: Arc<AtomicU64>,
}

impl OutputTracker {
    fn is_latest(&self, key: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == key
    }
}

impl PatientTaskListener<u64, PathBuf> for OutputTracker {
    fn on_start(&self, event: &TaskStart<u64>) {
        if self.is_latest(event.key) {
            let _ = self.cell.set(FutureValue::Running {
                cancel: None,
                started_at: Some(event.started_at),
            });
        }
    }

    fn on_done(&self, event: &TaskDone<u64, PathBuf>) {
        info!(
            "Conversion {} finished in {:?}: {}",
            event.key,
            event.runtime,
            event.value.display()
        );
        if self.is_latest(event.key) {
            let _ = self.cell.set(FutureValue::Finished {
                value: event.value.clone(),
                started_at: Some(event.started_at),
                runtime: Some(event.runtime),
            });
        }
    }

    fn on_stop(&self, event: &TaskStop<u64>) {
        info!("Conversion {} stopped", event.key);
        if self.is_latest(event.key) {
            let _ = self.cell.set(FutureValue::Stopped {
                started_at: Some(event.started_at),
                runtime: Some(event.runtime),
            });
        }
    }

    fn on_timeout(&self, event: &TaskTimeout<u64>) {
        warn!("Conversion {} timed out after {:?}", event.key, event.timeout);
        if self.is_latest(event.key) {
            let _ = self.cell.set(FutureValue::TimedOut {
                timeout: event.timeout,
                started_at: Some(event.started_at),
            });
        }
    }

    fn on_error(&self, event: &TaskError<u64>) {
        warn!("Conversion {} failed: {}", event.key, event.error);
        if self.is_latest(event.key) {
            let _ = self.cell.set(FutureValue::Failed {
                error: event.error.clone(),
                started_at: Some(event.started_at),
                runtime: Some(event.runtime),
            });
        }
    }

    fn on_finally(&self, event: &TaskFinally<u64>) {
        let result = event.outcome.as_str();
        metrics::CONVERSIONS_TOTAL.with_label_values(&[result]).inc();
        if let Some(runtime) = event.runtime {
            metrics::CONVERSION_DURATION
                .with_label_values(&[result])
                .observe(runtime.as_secs_f64());
        }
    }
}

/// One shared file and the conversions made from it.
///
/// The session publishes three observable values: the imported input, a
/// preview frame, and the output of the latest conversion. Conversions run on
/// a [`PatientTaskQueue`] keyed by submission number, so their results are
/// reported in the order they were requested.
pub struct ConversionSession<R> {
    runner: Arc<R>,
    dirs: AppDirs,
    frames: VideoFrameProbe<R>,
    queue: PatientTaskQueue<u64, PathBuf>,
    timeout: Duration,
    next_id: AtomicU64,
    latest: Arc<AtomicU64>,
    share: Mutex<Option<ShareInfo>>,
    input: FutureCell<PathBuf>,
    preview: FutureCell<PathBuf>,
    output: FutureCell<PathBuf>,
}

impl<R: ToolRunner + 'static> ConversionSession<R> {
    /// Creates a session. `timeout` bounds each conversion.
    pub fn new(runner: Arc<R>, dirs: AppDirs, timeout: Duration) -> Self {
        let output = FutureCell::default();
        let latest = Arc::new(AtomicU64::new(0));
        let queue = PatientTaskQueue::new().with_listener(Arc::new(OutputTracker {
            cell: output.clone(),
            latest: Arc::clone(&latest),
        }));

        Self {
            frames: VideoFrameProbe::new(Arc::clone(&runner)),
            runner,
            dirs,
            queue,
            timeout,
            next_id: AtomicU64::new(1),
            latest,
            share: Mutex::new(None),
            input: FutureCell::default(),
            preview: FutureCell::default(),
            output,
        }
    }

    /// The queue conversions run on, for attaching listeners.
    pub fn queue(&self) -> &PatientTaskQueue<u64, PathBuf> {
        &self.queue
    }

    pub fn dirs(&self) -> &AppDirs {
        &self.dirs
    }

    /// The imported copy of the shared file.
    pub fn input(&self) -> &FutureCell<PathBuf> {
        &self.input
    }

    /// Preview image of the input.
    pub fn preview(&self) -> &FutureCell<PathBuf> {
        &self.preview
    }

    /// Output of the latest conversion.
    pub fn output(&self) -> &FutureCell<PathBuf> {
        &self.output
    }

    pub fn share_info(&self) -> Option<ShareInfo> {
        self.share
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Validates a shared file, copies it into the input directory, and starts
    /// its preview.
    ///
    /// Images preview as themselves; videos get a frame extracted in the
    /// background.
    pub async fn import(&self, request: &ShareRequest) -> Result<ShareInfo, ConvertError> {
        self.input.reset(FutureValue::running_now());

        let imported = async {
            let info = request.validate()?;
            let path = self.dirs.import(&info.path, &info.extension).await?;
            Ok::<_, ConvertError>((info, path))
        }
        .await;

        let (info, path) = match imported {
            Ok(imported) => imported,
            Err(e) => {
                warn!("Import failed: {}", e);
                self.input.reset(FutureValue::failed(SharedMessage(e.to_string())));
                return Err(e);
            }
        };

        info!("Imported {} ({}) as {}", info.path.display(), info.mime, path.display());
        let _ = self.input.set(FutureValue::finished(path.clone()));
        *self.share.lock().unwrap_or_else(|e| e.into_inner()) = Some(info.clone());

        match info.mime_type() {
            Some(mime) if mime.is_video() => {
                self.frames
                    .post_video_frame(path, DEFAULT_PREVIEW_RATIO, self.preview.clone());
            }
            _ => self.preview.reset(FutureValue::finished(path)),
        }
        Ok(info)
    }

    /// Extracts a new preview frame at `ratio` of the imported video.
    pub fn preview_at(&self, ratio: f32) -> Result<JoinHandle<()>, ConvertError> {
        let input = self.input.finished_value().ok_or(ConvertError::NotImported)?;
        Ok(self
            .frames
            .post_video_frame(input, ratio, self.preview.clone()))
    }

    /// Schedules a conversion of the imported file into `target`.
    ///
    /// Returns the conversion's queue key. Its outcome is reported through the
    /// queue's listeners and, while it is the latest one, the output cell.
    pub fn convert(
        &self,
        target: MimeType,
        options: &ConversionOptions,
    ) -> Result<u64, ConvertError> {
        let input = self.input.finished_value().ok_or(ConvertError::NotImported)?;
        if let Some(info) = self.share_info() {
            if !info.can_convert_to(target) {
                return Err(ConvertError::UnsupportedTarget {
                    from: info.mime,
                    to: target,
                });
            }
        }

        let output = self.dirs.output_for(&input, target.extension());
        let command = conversion_command(&input, &output, target, options);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        self.latest.store(id, Ordering::SeqCst);
        self.output.reset(FutureValue::pending_now());
        info!("Conversion {} queued: {}", id, command);

        let runner = Arc::clone(&self.runner);
        self.queue.add_run_roll(id, self.timeout, move || async move {
            if let Err(e) = runner.execute(&command).await {
                return Err(Box::new(e) as BoxError);
            }
            if !tokio::fs::try_exists(&output).await.unwrap_or(false) {
                return Err(Box::new(MediaError::OutputMissing { path: output }) as BoxError);
            }
            Ok(output)
        })?;
        Ok(id)
    }

    /// Converts and waits for the result.
    pub async fn convert_and_wait(
        &self,
        target: MimeType,
        options: &ConversionOptions,
    ) -> Result<PathBuf, ConvertError> {
        self.convert(target, options)?;
        self.drain().await;
        match self.output.snapshot() {
            FutureValue::Finished { value, .. } => Ok(value),
            FutureValue::TimedOut { timeout, .. } => Err(ConvertError::Timeout(timeout)),
            FutureValue::Stopped { .. } => Err(ConvertError::Cancelled),
            FutureValue::Failed { error, .. } => Err(ConvertError::Failed(error)),
            FutureValue::Pending { .. } | FutureValue::Running { .. } => {
                Err(ConvertError::Cancelled)
            }
        }
    }

    /// Stops a running conversion.
    pub fn stop(&self, id: u64) -> Result<(), ConvertError> {
        self.queue.stop(&id)?;
        self.queue.roll_forward();
        Ok(())
    }

    /// Waits for running conversions and reports them. Returns how many are left.
    pub async fn drain(&self) -> usize {
        self.queue.drain().await
    }
}

/// Error carrying only a message, for failures published to a cell.
#[derive(Debug, Error)]
#[error("{0}")]
struct SharedMessage(String);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockToolRunner;
    use crate::units::BitUnit;
    use tempfile::TempDir;

    #[test]
    fn test_conversion_command_for_video() {
        let options = ConversionOptions::default()
            .with_bitrate_kbps(1024)
            .with_resolution(Resolution::HD)
            .with_max_size(BitValue::new(1.0, BitUnit::MEGABYTE));
        let cmd = conversion_command(
            Path::new("/in/a.mp4"),
            Path::new("/out/a.webm"),
            MimeType::Webm,
            &options,
        );
        assert_eq!(
            cmd.to_string(),
            "ffmpeg -hide_banner -y -i /in/a.mp4 /out/a.webm -b:v 1024k -s 1280x720 -fs 1000000"
        );
    }

    #[test]
    fn test_conversion_command_skips_bitrate_for_images() {
        let options = ConversionOptions::default().with_bitrate_kbps(512);
        let cmd = conversion_command(
            Path::new("/in/a.png"),
            Path::new("/out/a.gif"),
            MimeType::Gif,
            &options,
        );
        assert_eq!(cmd.to_string(), "ffmpeg -hide_banner -y -i /in/a.png /out/a.gif");
    }

    async fn session(runner: Arc<MockToolRunner>) -> (ConversionSession<MockToolRunner>, TempDir) {
        let root = TempDir::new().unwrap();
        let dirs = AppDirs::open(root.path().join("app")).await.unwrap();
        (
            ConversionSession::new(runner, dirs, Duration::from_secs(5)),
            root,
        )
    }

    fn shared_file(root: &TempDir, name: &str) -> PathBuf {
        let path = root.path().join(name);
        std::fs::write(&path, b"data").unwrap();
        path
    }

    #[tokio::test]
    async fn test_image_previews_as_itself() {
        let (session, root) = session(Arc::new(MockToolRunner::new())).await;
        let source = shared_file(&root, "photo.png");

        let info = session.import(&ShareRequest::new(&source)).await.unwrap();
        assert_eq!(info.mime, "image/png");

        let input = session.input().finished_value().unwrap();
        assert!(input.starts_with(session.dirs().input_dir()));
        assert_eq!(input.extension().unwrap(), "png");
        assert_eq!(session.preview().finished_value(), Some(input));
    }

    #[tokio::test]
    async fn test_video_preview_extracts_frame() {
        let runner = Arc::new(MockToolRunner::new());
        let (session, root) = session(Arc::clone(&runner)).await;
        let source = shared_file(&root, "clip.mp4");

        session.import(&ShareRequest::new(&source)).await.unwrap();
        let preview = session.preview().wait_ended().await;
        let image = preview.finished_value().expect("Preview should finish");
        assert_eq!(image.extension().unwrap(), "jpg");

        let executed = runner.executed().await;
        assert_eq!(executed.len(), 1);
        assert!(executed[0].to_string().contains("-vframes 1 -ss 0:0:5.0 -y"));
    }

    #[tokio::test]
    async fn test_convert_and_wait_produces_output() {
        let runner = Arc::new(MockToolRunner::new());
        let (session, root) = session(Arc::clone(&runner)).await;
        let source = shared_file(&root, "photo.png");
        session.import(&ShareRequest::new(&source)).await.unwrap();

        let output = session
            .convert_and_wait(MimeType::Gif, &ConversionOptions::default())
            .await
            .unwrap();
        assert!(output.starts_with(session.dirs().output_dir()));
        assert_eq!(output.extension().unwrap(), "gif");
        assert_eq!(std::fs::read(&output).unwrap(), b"mock output");
        assert_eq!(session.output().kind(), crate::future::FutureKind::Finished);
        assert!(session.queue().is_empty());
    }

    #[tokio::test]
    async fn test_convert_requires_import() {
        let (session, _root) = session(Arc::new(MockToolRunner::new())).await;
        let err = session
            .convert(MimeType::Gif, &ConversionOptions::default())
            .unwrap_err();
        assert!(matches!(err, ConvertError::NotImported));
    }

    #[tokio::test]
    async fn test_convert_rejects_unsupported_target() {
        let (session, root) = session(Arc::new(MockToolRunner::new())).await;
        let source = shared_file(&root, "photo.png");
        session.import(&ShareRequest::new(&source)).await.unwrap();

        let err = session
            .convert(MimeType::Webm, &ConversionOptions::default())
            .unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedTarget { .. }));
    }

    #[tokio::test]
    async fn test_tool_failure_is_reported() {
        let runner = Arc::new(MockToolRunner::new());
        let (session, root) = session(Arc::clone(&runner)).await;
        let source = shared_file(&root, "photo.png");
        session.import(&ShareRequest::new(&source)).await.unwrap();

        runner
            .set_next_error(MediaError::tool_failed("boom", None))
            .await;
        let err = session
            .convert_and_wait(MimeType::Gif, &ConversionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::Failed(_)));
        assert_eq!(session.output().kind(), crate::future::FutureKind::Failed);
    }

    #[tokio::test]
    async fn test_slow_conversion_times_out() {
        let runner = Arc::new(MockToolRunner::new());
        let root = TempDir::new().unwrap();
        let dirs = AppDirs::open(root.path().join("app")).await.unwrap();
        let session =
            ConversionSession::new(Arc::clone(&runner), dirs, Duration::from_millis(20));
        let source = shared_file(&root, "photo.png");
        session.import(&ShareRequest::new(&source)).await.unwrap();

        runner.set_execution_delay(Duration::from_secs(2)).await;
        let err = session
            .convert_and_wait(MimeType::Gif, &ConversionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::Timeout(t) if t == Duration::from_millis(20)));
    }

    #[tokio::test]
    async fn test_import_missing_file_fails_input() {
        let (session, root) = session(Arc::new(MockToolRunner::new())).await;
        let err = session
            .import(&ShareRequest::new(root.path().join("nope.png")))
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::Share(ShareError::MissingFile(_))));
        assert_eq!(session.input().kind(), crate::future::FutureKind::Failed);
        assert!(session.share_info().is_none());
    }

    #[test]
    fn test_options_from_settings() {
        let store = crate::settings::MemorySettingsStore::new();
        let settings = Settings::default();
        settings.bit_rate().set(&store, 2048).unwrap();

        let options = ConversionOptions::from_settings(&settings, &store).unwrap();
        assert_eq!(options.bitrate_kbps, Some(2048));
        assert_eq!(options.resolution, Some(Resolution::FHD));
        assert_eq!(options.max_size.unwrap().to_string(), "10 GB");
    }
}
