//! Lifecycle state of an asynchronously produced value.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Shared error produced by a task body.
pub type SharedError = Arc<dyn StdError + Send + Sync>;

/// A value that becomes available later.
///
/// Exactly one variant is active. Transitions only move forward:
/// `Pending` → `Running` → one of the terminal variants (`Finished`, `Stopped`,
/// `TimedOut`, `Failed`).
#[derive(Clone)]
pub enum FutureValue<V> {
    /// Waiting to be started.
    Pending { added_at: Option<DateTime<Utc>> },
    /// Being computed.
    Running {
        cancel: Option<CancellationToken>,
        started_at: Option<DateTime<Utc>>,
    },
    /// Done, the value is ready.
    Finished {
        value: V,
        started_at: Option<DateTime<Utc>>,
        runtime: Option<Duration>,
    },
    /// Cancelled on purpose.
    Stopped {
        started_at: Option<DateTime<Utc>>,
        runtime: Option<Duration>,
    },
    /// Ran out of time.
    TimedOut {
        timeout: Duration,
        started_at: Option<DateTime<Utc>>,
    },
    /// The computation raised an error.
    Failed {
        error: SharedError,
        started_at: Option<DateTime<Utc>>,
        runtime: Option<Duration>,
    },
}

/// Variant tag of a [`FutureValue`], free of the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FutureKind {
    Pending,
    Running,
    Finished,
    Stopped,
    TimedOut,
    Failed,
}

impl FutureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Stopped => "stopped",
            Self::TimedOut => "timed_out",
            Self::Failed => "failed",
        }
    }

    /// Whether this is one of the terminal kinds.
    pub fn is_ended(&self) -> bool {
        matches!(
            self,
            Self::Finished | Self::Stopped | Self::TimedOut | Self::Failed
        )
    }

    /// Position in the lifecycle; transitions must strictly increase it.
    pub(crate) fn stage(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Running => 1,
            _ => 2,
        }
    }
}

impl fmt::Display for FutureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<V> Default for FutureValue<V> {
    fn default() -> Self {
        Self::Pending { added_at: None }
    }
}

impl<V> FutureValue<V> {
    /// Pending, stamped with the current time.
    pub fn pending_now() -> Self {
        Self::Pending {
            added_at: Some(Utc::now()),
        }
    }

    /// Running without a cancellation handle, stamped with the current time.
    pub fn running_now() -> Self {
        Self::Running {
            cancel: None,
            started_at: Some(Utc::now()),
        }
    }

    /// Finished without timing information.
    pub fn finished(value: V) -> Self {
        Self::Finished {
            value,
            started_at: None,
            runtime: None,
        }
    }

    /// Failed without timing information.
    pub fn failed(error: impl StdError + Send + Sync + 'static) -> Self {
        Self::Failed {
            error: Arc::new(error),
            started_at: None,
            runtime: None,
        }
    }

    pub fn kind(&self) -> FutureKind {
        match self {
            Self::Pending { .. } => FutureKind::Pending,
            Self::Running { .. } => FutureKind::Running,
            Self::Finished { .. } => FutureKind::Finished,
            Self::Stopped { .. } => FutureKind::Stopped,
            Self::TimedOut { .. } => FutureKind::TimedOut,
            Self::Failed { .. } => FutureKind::Failed,
        }
    }

    /// The value if this is `Finished`, regardless of how other states came about.
    pub fn finished_value(&self) -> Option<&V> {
        match self {
            Self::Finished { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn into_finished_value(self) -> Option<V> {
        match self {
            Self::Finished { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }

    /// Finished, stopped, timed out, or failed.
    pub fn is_ended(&self) -> bool {
        self.kind().is_ended()
    }

    /// Timed out or failed. A stop is not a failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::TimedOut { .. } | Self::Failed { .. })
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Pending { .. } => None,
            Self::Running { started_at, .. }
            | Self::Finished { started_at, .. }
            | Self::Stopped { started_at, .. }
            | Self::TimedOut { started_at, .. }
            | Self::Failed { started_at, .. } => *started_at,
        }
    }

    /// Elapsed time of a terminal state. For a timeout this is the configured timeout.
    pub fn runtime(&self) -> Option<Duration> {
        match self {
            Self::Finished { runtime, .. }
            | Self::Stopped { runtime, .. }
            | Self::Failed { runtime, .. } => *runtime,
            Self::TimedOut { timeout, .. } => Some(*timeout),
            _ => None,
        }
    }

    /// The error of a `Failed` state.
    pub fn error(&self) -> Option<&SharedError> {
        match self {
            Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for FutureValue<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending { added_at } => f.debug_struct("Pending").field("added_at", added_at).finish(),
            Self::Running { cancel, started_at } => f
                .debug_struct("Running")
                .field("cancellable", &cancel.is_some())
                .field("started_at", started_at)
                .finish(),
            Self::Finished {
                value,
                started_at,
                runtime,
            } => f
                .debug_struct("Finished")
                .field("value", value)
                .field("started_at", started_at)
                .field("runtime", runtime)
                .finish(),
            Self::Stopped {
                started_at,
                runtime,
            } => f
                .debug_struct("Stopped")
                .field("started_at", started_at)
                .field("runtime", runtime)
                .finish(),
            Self::TimedOut {
                timeout,
                started_at,
            } => f
                .debug_struct("TimedOut")
                .field("timeout", timeout)
                .field("started_at", started_at)
                .finish(),
            Self::Failed {
                error,
                started_at,
                runtime,
            } => f
                .debug_struct("Failed")
                .field("error", &error.to_string())
                .field("started_at", started_at)
                .field("runtime", runtime)
                .finish(),
        }
    }
}

/// Elapsed wall-clock time since `started_at`, clamped at zero.
pub(crate) fn elapsed_since(started_at: DateTime<Utc>) -> Duration {
    (Utc::now() - started_at).to_std().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("boom")]
    struct Boom;

    #[test]
    fn test_finished_value_only_for_finished() {
        let finished = FutureValue::finished(5);
        assert_eq!(finished.finished_value(), Some(&5));

        let failed: FutureValue<i32> = FutureValue::failed(Boom);
        assert_eq!(failed.finished_value(), None);
        assert_eq!(FutureValue::<i32>::pending_now().finished_value(), None);
        assert_eq!(FutureValue::<i32>::running_now().into_finished_value(), None);
    }

    #[test]
    fn test_kinds_and_terminal_states() {
        let stopped: FutureValue<()> = FutureValue::Stopped {
            started_at: None,
            runtime: Some(Duration::from_millis(3)),
        };
        assert!(stopped.is_ended());
        assert!(!stopped.is_failure());

        let timed_out: FutureValue<()> = FutureValue::TimedOut {
            timeout: Duration::from_secs(2),
            started_at: None,
        };
        assert!(timed_out.is_failure());
        assert_eq!(timed_out.runtime(), Some(Duration::from_secs(2)));
        assert_eq!(timed_out.kind().to_string(), "timed_out");

        assert!(!FutureValue::<()>::running_now().is_ended());
        assert!(FutureValue::<()>::pending_now().is_pending());
    }

    #[test]
    fn test_failed_keeps_error_message() {
        let failed: FutureValue<()> = FutureValue::failed(Boom);
        assert_eq!(failed.error().map(|e| e.to_string()), Some("boom".to_string()));
    }

    #[test]
    fn test_stage_ordering() {
        assert!(FutureKind::Pending.stage() < FutureKind::Running.stage());
        assert!(FutureKind::Running.stage() < FutureKind::Failed.stage());
        assert_eq!(FutureKind::Finished.stage(), FutureKind::Stopped.stage());
    }
}
