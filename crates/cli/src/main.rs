mod cli;
mod commands;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flare_core::{load_config, load_config_from_env, validate_config, Config};

use cli::{Cli, LogFormat};

/// Config file picked up from the working directory when none is given.
const DEFAULT_CONFIG_FILE: &str = "flare.toml";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    if let Err(e) = run(cli).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(cli.config.as_deref())?;
    validate_config(&config).context("Configuration validation failed")?;

    let registry = prometheus::Registry::new();
    flare_core::metrics::register_metrics(&registry);

    commands::dispatch(cli.command, &config).await?;

    if cli.print_metrics {
        print!("{}", flare_core::metrics::encode_text(&registry));
    }
    Ok(())
}

/// Loads the configuration from the given file, `flare.toml`, or the
/// environment alone, in that order.
fn resolve_config(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.exists()),
    };

    match path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            load_config(&path).with_context(|| format!("Failed to load config from {:?}", path))
        }
        None => {
            info!("No configuration file, using defaults and environment");
            load_config_from_env().context("Failed to load config from environment")
        }
    }
}
