//! Events emitted by the patient task queue.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::future::{FutureKind, SharedError};

/// A task was registered.
#[derive(Debug, Clone)]
pub struct TaskAdd<K> {
    pub key: K,
}

/// A task moved from pending to running.
#[derive(Debug, Clone)]
pub struct TaskStart<K> {
    pub key: K,
    pub started_at: DateTime<Utc>,
}

/// A running task was stopped on purpose.
#[derive(Debug, Clone)]
pub struct TaskStop<K> {
    pub key: K,
    pub started_at: DateTime<Utc>,
    pub runtime: Duration,
}

/// A task produced its value.
#[derive(Debug, Clone)]
pub struct TaskDone<K, V> {
    pub key: K,
    pub value: V,
    pub started_at: DateTime<Utc>,
    pub runtime: Duration,
}

/// A task exceeded its timeout.
#[derive(Debug, Clone)]
pub struct TaskTimeout<K> {
    pub key: K,
    pub timeout: Duration,
    pub started_at: DateTime<Utc>,
}

/// A task body returned an error.
#[derive(Debug, Clone)]
pub struct TaskError<K> {
    pub key: K,
    pub error: SharedError,
    pub started_at: DateTime<Utc>,
    pub runtime: Duration,
}

/// Fired once after a task's terminal event, whatever the outcome. Useful for cleanup.
#[derive(Debug, Clone)]
pub struct TaskFinally<K> {
    pub key: K,
    pub outcome: FutureKind,
    pub started_at: Option<DateTime<Utc>>,
    pub runtime: Option<Duration>,
}

/// Any queue event.
#[derive(Debug, Clone)]
pub enum PatientTaskEvent<K, V> {
    Add(TaskAdd<K>),
    Start(TaskStart<K>),
    Stop(TaskStop<K>),
    Done(TaskDone<K, V>),
    Timeout(TaskTimeout<K>),
    Error(TaskError<K>),
    Finally(TaskFinally<K>),
}

impl<K, V> PatientTaskEvent<K, V> {
    pub fn key(&self) -> &K {
        match self {
            Self::Add(e) => &e.key,
            Self::Start(e) => &e.key,
            Self::Stop(e) => &e.key,
            Self::Done(e) => &e.key,
            Self::Timeout(e) => &e.key,
            Self::Error(e) => &e.key,
            Self::Finally(e) => &e.key,
        }
    }

    /// Event name, used for logging and metric labels.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Add(_) => "task_add",
            Self::Start(_) => "task_start",
            Self::Stop(_) => "task_stop",
            Self::Done(_) => "task_done",
            Self::Timeout(_) => "task_timeout",
            Self::Error(_) => "task_error",
            Self::Finally(_) => "task_finally",
        }
    }

    /// Whether this event reports a terminal outcome (done, stop, timeout, error).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Stop(_) | Self::Done(_) | Self::Timeout(_) | Self::Error(_)
        )
    }
}
