//! Error types for the media module.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while driving the external media tool.
#[derive(Debug, Error)]
pub enum MediaError {
    /// Tool binary not found.
    #[error("Media tool not found at path: {path}")]
    ToolNotFound { path: PathBuf },

    /// Input file not found.
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// Input is not a video.
    #[error("Not a video: {path}")]
    NotAVideo { path: PathBuf },

    /// Could not name the file to write next to the input.
    #[error("Failed to reference output for: {path}")]
    InvalidOutputPath { path: PathBuf },

    /// Tool exited with a failure status.
    #[error("Tool failed: {reason}")]
    ToolFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// Tool did not exit in time.
    #[error("Tool timed out after {0:?}")]
    Timeout(Duration),

    /// Failed to probe media file.
    #[error("Failed to probe media file: {reason}")]
    ProbeFailed { reason: String },

    /// Tool exited successfully but the expected file is missing.
    #[error("Output file not created: {path}")]
    OutputMissing { path: PathBuf },

    /// I/O error while running the tool.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    pub fn tool_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::ToolFailed {
            reason: reason.into(),
            stderr,
        }
    }

    pub fn probe_failed(reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            reason: reason.into(),
        }
    }

    /// Whether retrying the same invocation could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Io(_))
    }
}
