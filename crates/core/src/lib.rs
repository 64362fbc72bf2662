pub mod command;
pub mod config;
pub mod convert;
pub mod files;
pub mod future;
pub mod media;
pub mod metrics;
pub mod queue;
pub mod settings;
pub mod share;
pub mod testing;
pub mod units;

pub use command::{Argument, ArgumentKey, Command, FfmpegCommand};
pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config, ConfigError,
};
pub use convert::{ConversionOptions, ConversionSession, ConvertError};
pub use files::{AppDirs, FilesError};
pub use future::{FutureCell, FutureKind, FutureValue};
pub use media::{FfmpegRunner, MediaError, MimeType, Resolution, ToolRunner, VideoFrameProbe};
pub use queue::{PatientTaskEvent, PatientTaskListener, PatientTaskQueue, QueueError};
pub use settings::{Settings, SettingsStore, SqliteSettingsStore};
pub use share::{ShareError, ShareInfo, ShareRequest};
pub use units::{BitUnit, BitValue};
