use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Tool paths and storage paths are not empty
/// - Timeouts are not 0
/// - The default bitrate is positive
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.tool.ffmpeg_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "tool.ffmpeg_path cannot be empty".to_string(),
        ));
    }
    if config.tool.ffprobe_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "tool.ffprobe_path cannot be empty".to_string(),
        ));
    }
    if config.tool.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "tool.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.storage.root.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "storage.root cannot be empty".to_string(),
        ));
    }
    if config.storage.database.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "storage.database cannot be empty".to_string(),
        ));
    }

    if config.queue.conversion_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "queue.conversion_timeout_secs cannot be 0".to_string(),
        ));
    }
    if config.queue.frame_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "queue.frame_timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.settings.bit_rate <= 0 {
        return Err(ConfigError::ValidationError(format!(
            "settings.bit_rate must be positive, got {}",
            config.settings.bit_rate
        )));
    }

    Ok(())
}
