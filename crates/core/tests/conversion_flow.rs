//! Conversion session integration tests.
//!
//! These tests run a session against the mock tool runner, with settings in a
//! SQLite store and scratch directories under a temp dir:
//! - Importing videos and images, with their previews
//! - Converting with options taken from remembered settings
//! - Stopping a conversion
//! - Cleaning up scratch directories

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio_test::assert_ok;

use flare_core::{
    testing::MockToolRunner, AppDirs, BitUnit, BitValue, ConversionOptions, ConversionSession,
    FutureKind, MimeType, Resolution, Settings, ShareRequest, SqliteSettingsStore,
};

/// Test helper bundling a session with its mock runner and stores.
struct TestHarness {
    session: ConversionSession<MockToolRunner>,
    runner: Arc<MockToolRunner>,
    settings: Settings,
    store: SqliteSettingsStore,
    temp_dir: TempDir,
    share_dir: TempDir,
}

impl TestHarness {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let share_dir = TempDir::new().expect("Failed to create share dir");

        let runner = Arc::new(MockToolRunner::new().with_duration(Duration::from_secs(8)));
        let dirs = AppDirs::open(temp_dir.path().join("data"))
            .await
            .expect("Failed to open app dirs");
        let store = SqliteSettingsStore::new(&temp_dir.path().join("settings.db"))
            .expect("Failed to open settings store");

        Self {
            session: ConversionSession::new(Arc::clone(&runner), dirs, Duration::from_secs(10)),
            runner,
            settings: Settings::default(),
            store,
            temp_dir,
            share_dir,
        }
    }

    fn shared_file(&self, name: &str) -> PathBuf {
        let path = self.share_dir.path().join(name);
        std::fs::write(&path, b"shared bytes").expect("Failed to write shared file");
        path
    }
}

#[tokio::test]
async fn test_video_import_preview_and_convert() {
    let h = TestHarness::new().await;
    let source = h.shared_file("holiday.mov");

    let info = assert_ok!(
        h.session
            .import(&ShareRequest::new(&source).with_mime("video/quicktime"))
            .await
    );
    assert_eq!(info.extension, "mp4");
    assert!(info.can_convert_to(MimeType::Gif));

    let preview = h.session.preview().wait_ended().await;
    assert_eq!(preview.kind(), FutureKind::Finished);

    // Remember the user's choices, then convert with them.
    let last_mime = h.settings.last_output_mime(MimeType::Quicktime);
    assert_ok!(last_mime.set(&h.store, &MimeType::Webm));
    assert_ok!(h.settings.bit_rate().set(&h.store, 768));
    assert_ok!(h.settings.resolution().set(&h.store, &Resolution::HD));
    assert_ok!(h
        .settings
        .max_size()
        .set(&h.store, &BitValue::new(50.0, BitUnit::MEGABYTE)));

    let target = assert_ok!(last_mime.get(&h.store));
    let options = assert_ok!(ConversionOptions::from_settings(&h.settings, &h.store));
    let output = assert_ok!(h.session.convert_and_wait(target, &options).await);

    assert_eq!(output.extension().unwrap(), "webm");
    assert!(output.starts_with(h.session.dirs().output_dir()));

    let executed = h.runner.executed().await;
    let conversion = executed.last().expect("Conversion should have run");
    assert!(conversion
        .to_string()
        .ends_with("-b:v 768k -s 1280x720 -fs 50000000"));
}

#[tokio::test]
async fn test_settings_survive_reopen() {
    let h = TestHarness::new().await;
    assert_ok!(h.settings.bit_rate().set(&h.store, 4096));

    let db_path = h.temp_dir.path().join("settings.db");
    let reopened = assert_ok!(SqliteSettingsStore::new(&db_path));
    assert_eq!(assert_ok!(h.settings.bit_rate().get(&reopened)), 4096);
}

#[tokio::test]
async fn test_image_convert_then_export() {
    let h = TestHarness::new().await;
    let source = h.shared_file("scan.jpg");

    assert_ok!(h.session.import(&ShareRequest::new(&source)).await);
    assert_eq!(h.session.preview().kind(), FutureKind::Finished);

    let output = assert_ok!(
        h.session
            .convert_and_wait(MimeType::Png, &ConversionOptions::default())
            .await
    );
    assert!(h.session.dirs().can_export(&output).await);
    assert!(!h.session.dirs().can_export(&source).await);

    assert_eq!(assert_ok!(h.session.dirs().clear_input().await), 1);
    assert_eq!(assert_ok!(h.session.dirs().clear_output().await), 1);
}

#[tokio::test]
async fn test_stop_running_conversion() {
    let h = TestHarness::new().await;
    let source = h.shared_file("clip.webm");
    assert_ok!(h.session.import(&ShareRequest::new(&source)).await);
    h.session.preview().wait_ended().await;

    h.runner.set_execution_delay(Duration::from_secs(5)).await;
    let id = assert_ok!(h
        .session
        .convert(MimeType::Gif, &ConversionOptions::default()));
    assert_eq!(h.session.output().kind(), FutureKind::Running);

    assert_ok!(h.session.stop(id));
    assert_eq!(h.session.drain().await, 0);
    assert_eq!(h.session.output().kind(), FutureKind::Stopped);
}

#[tokio::test]
async fn test_latest_conversion_owns_output() {
    let h = TestHarness::new().await;
    let source = h.shared_file("photo.png");
    assert_ok!(h.session.import(&ShareRequest::new(&source)).await);

    let first = assert_ok!(h
        .session
        .convert(MimeType::Gif, &ConversionOptions::default()));
    let second = assert_ok!(h
        .session
        .convert(MimeType::Jpeg, &ConversionOptions::default()));
    assert!(second > first);

    h.session.drain().await;
    let output = h
        .session
        .output()
        .finished_value()
        .expect("Latest conversion should finish");
    assert_eq!(output.extension().unwrap(), "jpeg");
}
