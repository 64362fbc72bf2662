//! Subcommand implementations.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::info;

use flare_core::{
    media::convertible_targets, AppDirs, Config, ConversionOptions, ConversionSession,
    FfmpegRunner, MimeType, Settings, SettingsStore, ShareRequest, SqliteSettingsStore,
    ToolRunner, VideoFrameProbe,
};

use crate::cli::{CleanArgs, Commands, ConvertArgs, FormatsArgs, FrameArgs};

pub async fn dispatch(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Formats(args) => formats(args),
        Commands::Frame(args) => frame(args, config).await,
        Commands::Convert(args) => convert(args, config).await,
        Commands::Clean(args) => clean(args, config).await,
        Commands::Check => check(config).await,
        Commands::Config => print_json(config),
    }
}

#[derive(Debug, Serialize)]
struct FormatEntry {
    mime: String,
    extensions: &'static [&'static str],
}

fn formats(args: FormatsArgs) -> Result<()> {
    let types: Vec<MimeType> = match args.from {
        Some(mime) => convertible_targets(&mime)
            .with_context(|| format!("Cannot convert from {}", mime))?,
        None => MimeType::all().collect(),
    };
    let entries: Vec<FormatEntry> = types
        .into_iter()
        .map(|m| FormatEntry {
            mime: m.mime(),
            extensions: m.extensions(),
        })
        .collect();
    print_json(&entries)
}

async fn frame(args: FrameArgs, config: &Config) -> Result<()> {
    let runner = Arc::new(FfmpegRunner::new(config.tool.clone()));
    let probe = VideoFrameProbe::new(runner);

    let image = tokio::time::timeout(
        config.queue.frame_timeout(),
        probe.extract(&args.video, args.ratio),
    )
    .await
    .with_context(|| format!("Frame extraction timed out for {:?}", args.video))?
    .with_context(|| format!("Failed to extract a frame from {:?}", args.video))?;

    println!("{}", image.display());
    Ok(())
}

#[derive(Debug, Serialize)]
struct ConvertReport {
    input: String,
    from: String,
    to: String,
    output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    exported: Option<String>,
}

async fn convert(args: ConvertArgs, config: &Config) -> Result<()> {
    let store = SqliteSettingsStore::new(&config.storage.database_path())
        .context("Failed to open settings store")?;
    let settings = Settings::new(config.settings.clone());
    let dirs = AppDirs::open(&config.storage.root)
        .await
        .context("Failed to prepare data directories")?;

    let runner = Arc::new(FfmpegRunner::new(config.tool.clone()));
    let session = ConversionSession::new(runner, dirs, config.queue.conversion_timeout());

    let mut request = ShareRequest::new(&args.input);
    if let Some(mime) = &args.mime {
        request = request.with_mime(mime);
    }
    let info = session.import(&request).await?;
    let Some(from) = info.mime_type() else {
        bail!("Unsupported input type: {}", info.mime);
    };

    let last_mime = settings.last_output_mime(from);
    let target = match args.to {
        Some(target) => target,
        None => last_mime.get(&store)?,
    };

    let mut options = ConversionOptions::from_settings(&settings, &store)?;
    if let Some(bitrate) = args.bitrate {
        options.bitrate_kbps = Some(bitrate);
    }
    if let Some(resolution) = args.resolution {
        options.resolution = Some(resolution);
    }
    if let Some(max_size) = args.max_size {
        options.max_size = Some(max_size);
    }

    if args.remember {
        remember(&settings, &store, from, target, &options)?;
    }

    info!("Converting {} to {}", info.mime, target);
    let output = session.convert_and_wait(target, &options).await?;

    let exported = match &args.output_dir {
        Some(dir) => Some(export(session.dirs(), &output, dir).await?),
        None => None,
    };

    print_json(&ConvertReport {
        input: args.input.display().to_string(),
        from: info.mime,
        to: target.mime(),
        output: output.display().to_string(),
        exported,
    })
}

fn remember(
    settings: &Settings,
    store: &dyn SettingsStore,
    from: MimeType,
    target: MimeType,
    options: &ConversionOptions,
) -> Result<()> {
    settings.last_output_mime(from).set(store, &target)?;
    if let Some(bitrate) = options.bitrate_kbps {
        settings
            .bit_rate()
            .set(store, i32::try_from(bitrate).unwrap_or(i32::MAX))?;
    }
    if let Some(resolution) = &options.resolution {
        settings.resolution().set(store, resolution)?;
    }
    if let Some(max_size) = &options.max_size {
        settings.max_size().set(store, max_size)?;
    }
    info!("Remembered {} as the target for {} inputs", target, from.category());
    Ok(())
}

async fn export(
    dirs: &AppDirs,
    output: &std::path::Path,
    dir: &std::path::Path,
) -> Result<String> {
    dirs.ensure_exportable(output).await?;
    let name = output
        .file_name()
        .context("Output has no file name")?;
    let target = dir.join(name);
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {:?}", dir))?;
    tokio::fs::copy(output, &target)
        .await
        .with_context(|| format!("Failed to copy {:?} to {:?}", output, target))?;
    Ok(target.display().to_string())
}

async fn clean(args: CleanArgs, config: &Config) -> Result<()> {
    let dirs = AppDirs::open(&config.storage.root)
        .await
        .context("Failed to prepare data directories")?;

    let mut removed = 0;
    if !args.output_only {
        removed += dirs.clear_input().await?;
    }
    if !args.input_only {
        removed += dirs.clear_output().await?;
    }
    info!("Removed {} files", removed);
    println!("{}", removed);
    Ok(())
}

async fn check(config: &Config) -> Result<()> {
    let runner = FfmpegRunner::new(config.tool.clone());
    runner
        .validate()
        .await
        .with_context(|| format!("{} is not usable", runner.name()))?;
    println!("ok");
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
