//! Per-key task records held by the queue.

use futures::future::BoxFuture;
use std::time::Duration;

use crate::future::FutureValue;

/// Error type a task body may return.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Zero-argument unit of work producing a value or an error.
pub type PatientTask<V> = Box<dyn FnOnce() -> BoxFuture<'static, Result<V, BoxError>> + Send>;

/// The queue's record for one key: the task, its timeout, and its current state.
pub(crate) struct TaskInfo<V> {
    /// Taken when the task starts running.
    pub(crate) task: Option<PatientTask<V>>,
    pub(crate) timeout: Duration,
    pub(crate) state: FutureValue<V>,
    /// Distinguishes this record from an earlier one registered under the same key.
    pub(crate) generation: u64,
}

impl<V> TaskInfo<V> {
    pub(crate) fn new(task: PatientTask<V>, timeout: Duration, generation: u64) -> Self {
        Self {
            task: Some(task),
            timeout,
            state: FutureValue::pending_now(),
            generation,
        }
    }
}
