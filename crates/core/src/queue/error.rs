//! Error types for the task queue.

use thiserror::Error;

use crate::future::FutureKind;

/// Lifecycle-contract violations reported synchronously by queue operations.
///
/// Failures of the task bodies themselves never surface here; they are recorded
/// in the task's state and reported through events.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Timeout must be non-zero.
    #[error("Timeout duration must be positive and non zero")]
    InvalidTimeout,

    /// No task registered under this key.
    #[error("Task not found: {key}")]
    NotFound { key: String },

    /// Operation requested on a task in the wrong lifecycle state.
    #[error("Cannot {operation} task {key}: current state is {state}")]
    IllegalState {
        key: String,
        state: FutureKind,
        operation: &'static str,
    },

    /// `run` was called outside of a tokio runtime and no handle was configured.
    #[error("No tokio runtime available to run tasks")]
    NoRuntime,
}

impl QueueError {
    pub(crate) fn not_found(key: &impl std::fmt::Debug) -> Self {
        Self::NotFound {
            key: format!("{:?}", key),
        }
    }

    pub(crate) fn illegal_state(
        key: &impl std::fmt::Debug,
        state: FutureKind,
        operation: &'static str,
    ) -> Self {
        Self::IllegalState {
            key: format!("{:?}", key),
            state,
            operation,
        }
    }
}
