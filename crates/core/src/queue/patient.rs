//! Queue that runs tasks concurrently but reports them in key order.

use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::collections::BTreeMap;
use std::any::Any;
use std::fmt::Debug;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, TryLockError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::error::Elapsed;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::future::{elapsed_since, FutureKind, FutureValue};
use crate::metrics;

use super::error::QueueError;
use super::events::{
    PatientTaskEvent, TaskAdd, TaskDone, TaskError, TaskFinally, TaskStart, TaskStop, TaskTimeout,
};
use super::listener::{dispatch, PatientTaskListener};
use super::task::{BoxError, TaskInfo};

/// Raw outcome handed from a worker back to the queue. `None` means cancelled.
type WorkerOutcome<V> = Option<Result<Result<V, BoxError>, Elapsed>>;

/// Keyed collection of tasks that run concurrently, each under its own timeout,
/// while their completion events are delivered strictly in key order.
///
/// Workers only record the terminal state of their task. Events for finished
/// tasks are surfaced by [`roll_forward`], which walks the queue from the front
/// and stops at the first task that has not ended yet. A later task that
/// finishes first is therefore held back until every earlier task has ended.
///
/// Keys are ordered by `Ord`, not by insertion, so they can encode priority.
///
/// This is cheaply cloneable; clones share the same queue.
///
/// [`roll_forward`]: PatientTaskQueue::roll_forward
pub struct PatientTaskQueue<K, V> {
    inner: Arc<Inner<K, V>>,
}

struct Inner<K, V> {
    tasks: Mutex<BTreeMap<K, TaskInfo<V>>>,
    listeners: RwLock<Vec<Arc<dyn PatientTaskListener<K, V>>>>,
    /// Held for the duration of a roll so events are never interleaved.
    rolling: Mutex<()>,
    generation: AtomicU64,
    /// Bumped whenever a task reaches a terminal state.
    completions: watch::Sender<u64>,
    runtime: Option<Handle>,
}

impl<K, V> Clone for PatientTaskQueue<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Default for PatientTaskQueue<K, V>
where
    K: Ord + Clone + Debug + Send + Sync + 'static,
    V: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> PatientTaskQueue<K, V>
where
    K: Ord + Clone + Debug + Send + Sync + 'static,
    V: Send + 'static,
{
    /// Creates an empty queue that spawns tasks on the ambient tokio runtime.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Creates an empty queue that spawns tasks on `handle`.
    pub fn with_runtime(handle: Handle) -> Self {
        Self::build(Some(handle))
    }

    fn build(runtime: Option<Handle>) -> Self {
        let (completions, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                tasks: Mutex::new(BTreeMap::new()),
                listeners: RwLock::new(Vec::new()),
                rolling: Mutex::new(()),
                generation: AtomicU64::new(0),
                completions,
                runtime,
            }),
        }
    }

    /// Registers a listener and returns the queue.
    pub fn with_listener(self, listener: Arc<dyn PatientTaskListener<K, V>>) -> Self {
        self.add_listener(listener);
        self
    }

    /// Registers a listener. Listeners are called in registration order.
    pub fn add_listener(&self, listener: Arc<dyn PatientTaskListener<K, V>>) {
        self.inner
            .listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(listener);
    }

    /// Adds a pending task.
    ///
    /// Returns `Ok(false)` without touching the existing task if `key` is
    /// already registered.
    pub fn add<F, Fut>(&self, key: K, timeout: Duration, task: F) -> Result<bool, QueueError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, BoxError>> + Send + 'static,
    {
        if timeout.is_zero() {
            return Err(QueueError::InvalidTimeout);
        }

        {
            let mut tasks = self.inner.lock_tasks();
            if tasks.contains_key(&key) {
                debug!("Task already queued: {:?}", key);
                return Ok(false);
            }
            let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed);
            let body = Box::new(move || task().boxed());
            tasks.insert(key.clone(), TaskInfo::new(body, timeout, generation));
        }

        metrics::QUEUE_TASKS_ADDED.inc();
        debug!("Task added: {:?} (timeout {:?})", key, timeout);
        self.inner.emit(&PatientTaskEvent::Add(TaskAdd { key }));
        Ok(true)
    }

    /// Starts a pending task on a worker and returns immediately.
    ///
    /// The outcome is not returned here: it is recorded in the task's state and
    /// reported by [`roll_forward`](Self::roll_forward) once every earlier task
    /// has been reported too.
    pub fn run(&self, key: &K) -> Result<(), QueueError> {
        let handle = match &self.inner.runtime {
            Some(handle) => handle.clone(),
            None => Handle::try_current().map_err(|_| QueueError::NoRuntime)?,
        };

        let (body, timeout, token, started_at, generation) = {
            let mut tasks = self.inner.lock_tasks();
            let info = tasks.get_mut(key).ok_or_else(|| QueueError::not_found(key))?;
            let kind = info.state.kind();
            if kind != FutureKind::Pending {
                return Err(QueueError::illegal_state(key, kind, "run"));
            }
            let body = info
                .task
                .take()
                .ok_or_else(|| QueueError::illegal_state(key, kind, "run"))?;

            let token = CancellationToken::new();
            let started_at = Utc::now();
            info.state = FutureValue::Running {
                cancel: Some(token.clone()),
                started_at: Some(started_at),
            };
            (body, info.timeout, token, started_at, info.generation)
        };

        debug!("Task started: {:?}", key);
        self.inner.emit(&PatientTaskEvent::Start(TaskStart {
            key: key.clone(),
            started_at,
        }));

        let inner = Arc::clone(&self.inner);
        let key = key.clone();
        handle.spawn(async move {
            // Cancellation is checked first so a stop is never reported as a timeout.
            let guarded = AssertUnwindSafe(async move { body().await })
                .catch_unwind()
                .map(|result| result.unwrap_or_else(|payload| Err(panic_error(payload))));
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                result = tokio::time::timeout(timeout, guarded) => Some(result),
            };
            inner.record(&key, generation, started_at, timeout, outcome);
        });

        Ok(())
    }

    /// Stops a running task.
    ///
    /// A missing key is a no-op. A task that exists but is not running is an
    /// illegal-state error.
    pub fn stop(&self, key: &K) -> Result<(), QueueError> {
        {
            let mut tasks = self.inner.lock_tasks();
            let Some(info) = tasks.get_mut(key) else {
                return Ok(());
            };
            stop_info(key, info)?;
        }
        debug!("Task stopped: {:?}", key);
        self.inner.notify_completion();
        Ok(())
    }

    /// Stops every running task. Returns how many were stopped.
    pub fn stop_all(&self) -> usize {
        let mut stopped = 0;
        {
            let mut tasks = self.inner.lock_tasks();
            for (key, info) in tasks.iter_mut() {
                if info.state.is_running() && stop_info(key, info).is_ok() {
                    stopped += 1;
                }
            }
        }
        if stopped > 0 {
            debug!("Stopped {} running tasks", stopped);
            self.inner.notify_completion();
        }
        stopped
    }

    /// Removes a task record.
    ///
    /// A missing key is a no-op success. A running task is only removed when
    /// `stop_running` is set; otherwise `Ok(false)` is returned and nothing
    /// changes. A removed task that had ended gets its finally event here,
    /// since it will never be rolled.
    pub fn remove(&self, key: &K, stop_running: bool) -> Result<bool, QueueError> {
        let removed = {
            let mut tasks = self.inner.lock_tasks();
            let Some(info) = tasks.get_mut(key) else {
                return Ok(true);
            };
            if info.state.is_running() {
                if !stop_running {
                    return Ok(false);
                }
                stop_info(key, info)?;
            }
            tasks.remove(key)
        };

        if let Some(info) = removed {
            debug!("Task removed: {:?}", key);
            if info.state.is_ended() {
                self.inner.emit(&PatientTaskEvent::Finally(TaskFinally {
                    key: key.clone(),
                    outcome: info.state.kind(),
                    started_at: info.state.started_at(),
                    runtime: info.state.runtime(),
                }));
            }
        }
        Ok(true)
    }

    /// Reports, in key order, every ended task at the front of the queue.
    ///
    /// For each ended task the typed event fires (done, stop, timeout, or error),
    /// then the finally event, and the task is removed. The walk stops at the
    /// first task that is still pending or running; tasks behind it are left
    /// untouched whatever their state. Returns the number of tasks reported.
    ///
    /// A roll requested while another is in progress returns 0 right away.
    pub fn roll_forward(&self) -> usize {
        let _guard = match self.inner.rolling.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                debug!("Roll already in progress");
                return 0;
            }
        };

        let mut rolled = 0;
        loop {
            let entry = {
                let mut tasks = self.inner.lock_tasks();
                match tasks.first_key_value() {
                    Some((_, info)) if info.state.is_ended() => tasks.pop_first(),
                    _ => None,
                }
            };
            let Some((key, info)) = entry else {
                break;
            };
            self.inner.announce(key, info.state);
            rolled += 1;
        }
        rolled
    }

    /// Adds a task, runs it, and rolls the queue forward.
    ///
    /// Returns `Ok(false)` if the key was already registered.
    pub fn add_run_roll<F, Fut>(&self, key: K, timeout: Duration, task: F) -> Result<bool, QueueError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, BoxError>> + Send + 'static,
    {
        if !self.add(key.clone(), timeout, task)? {
            return Ok(false);
        }
        self.run(&key)?;
        self.roll_forward();
        Ok(true)
    }

    /// Runs the first pending task in key order, then rolls forward.
    ///
    /// Returns the key that was started, if any.
    pub fn run_next_and_roll(&self) -> Result<Option<K>, QueueError> {
        let next = {
            let tasks = self.inner.lock_tasks();
            tasks
                .iter()
                .find(|(_, info)| info.state.is_pending())
                .map(|(key, _)| key.clone())
        };
        if let Some(ref key) = next {
            self.run(key)?;
        }
        self.roll_forward();
        Ok(next)
    }

    /// Rolls forward each time a task ends, until no task is running.
    ///
    /// Pending tasks are never started here. Returns the number of tasks left
    /// in the queue: pending ones, and ended ones held behind them.
    pub async fn drain(&self) -> usize {
        let mut completions = self.inner.completions.subscribe();
        loop {
            completions.borrow_and_update();
            self.roll_forward();
            let (len, running) = {
                let tasks = self.inner.lock_tasks();
                let running = tasks.values().any(|info| info.state.is_running());
                (tasks.len(), running)
            };
            if !running {
                return len;
            }
            if completions.changed().await.is_err() {
                return len;
            }
        }
    }

    /// Receiver bumped every time a task reaches a terminal state.
    pub fn completions(&self) -> watch::Receiver<u64> {
        self.inner.completions.subscribe()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock_tasks().contains_key(key)
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.state_kind(key) == Some(FutureKind::Pending)
    }

    pub fn is_running(&self, key: &K) -> bool {
        self.state_kind(key) == Some(FutureKind::Running)
    }

    /// Current state of a task, if registered.
    pub fn state_kind(&self, key: &K) -> Option<FutureKind> {
        self.inner.lock_tasks().get(key).map(|info| info.state.kind())
    }

    /// Configured timeout of a task, if registered.
    pub fn timeout_of(&self, key: &K) -> Option<Duration> {
        self.inner.lock_tasks().get(key).map(|info| info.timeout)
    }

    /// Registered keys in queue order.
    pub fn keys(&self) -> Vec<K> {
        self.inner.lock_tasks().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock_tasks().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock_tasks().is_empty()
    }
}

impl<K, V> PatientTaskQueue<K, V>
where
    K: Ord + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + 'static,
{
    /// Value of a task that finished but has not been rolled off yet.
    pub fn finished_value(&self, key: &K) -> Option<V> {
        self.inner
            .lock_tasks()
            .get(key)
            .and_then(|info| info.state.finished_value().cloned())
    }
}

/// Turns the payload of a panicking task body into the task's error.
fn panic_error(payload: Box<dyn Any + Send>) -> BoxError {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    };
    format!("Task panicked: {}", message).into()
}

/// Moves a running task to `Stopped` and cancels its worker.
fn stop_info<K: Debug, V>(key: &K, info: &mut TaskInfo<V>) -> Result<(), QueueError> {
    let FutureValue::Running { cancel, started_at } = &info.state else {
        return Err(QueueError::illegal_state(key, info.state.kind(), "stop"));
    };
    if let Some(token) = cancel {
        token.cancel();
    }
    let started_at = *started_at;
    info.state = FutureValue::Stopped {
        started_at,
        runtime: started_at.map(elapsed_since),
    };
    Ok(())
}

impl<K, V> Inner<K, V>
where
    K: Ord + Clone + Debug,
{
    fn lock_tasks(&self) -> MutexGuard<'_, BTreeMap<K, TaskInfo<V>>> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn notify_completion(&self) {
        self.completions.send_modify(|n| *n = n.wrapping_add(1));
    }

    /// Dispatches an event to every listener, without holding any queue lock.
    fn emit(&self, event: &PatientTaskEvent<K, V>) {
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for listener in &listeners {
            dispatch(listener.as_ref(), event);
        }
    }

    /// Records a worker's outcome unless the task was stopped, removed, or replaced meanwhile.
    fn record(
        &self,
        key: &K,
        generation: u64,
        started_at: DateTime<Utc>,
        timeout: Duration,
        outcome: WorkerOutcome<V>,
    ) {
        let started = Some(started_at);
        let next = match outcome {
            None => None,
            Some(Ok(Ok(value))) => Some(FutureValue::Finished {
                value,
                started_at: started,
                runtime: Some(elapsed_since(started_at)),
            }),
            Some(Ok(Err(error))) => Some(FutureValue::Failed {
                error: Arc::from(error),
                started_at: started,
                runtime: Some(elapsed_since(started_at)),
            }),
            Some(Err(_)) => Some(FutureValue::TimedOut {
                timeout,
                started_at: started,
            }),
        };

        if let Some(next) = next {
            let kind = next.kind();
            let mut tasks = self.lock_tasks();
            match tasks.get_mut(key) {
                Some(info) if info.generation == generation && info.state.is_running() => {
                    debug!("Task {:?} ended: {}", key, kind);
                    info.state = next;
                }
                _ => debug!("Discarding {} outcome of task {:?}: no longer running", kind, key),
            }
        }
        self.notify_completion();
    }

    /// Fires the terminal event of a rolled-off task, then its finally event.
    fn announce(&self, key: K, state: FutureValue<V>) {
        let outcome = state.kind();
        let started_at = state.started_at();
        let runtime = state.runtime();
        let started_or_now = started_at.unwrap_or_else(Utc::now);

        let event = match state {
            FutureValue::Finished { value, runtime, .. } => PatientTaskEvent::Done(TaskDone {
                key: key.clone(),
                value,
                started_at: started_or_now,
                runtime: runtime.unwrap_or_default(),
            }),
            FutureValue::Stopped { runtime, .. } => PatientTaskEvent::Stop(TaskStop {
                key: key.clone(),
                started_at: started_or_now,
                runtime: runtime.unwrap_or_default(),
            }),
            FutureValue::TimedOut { timeout, .. } => PatientTaskEvent::Timeout(TaskTimeout {
                key: key.clone(),
                timeout,
                started_at: started_or_now,
            }),
            FutureValue::Failed { error, runtime, .. } => PatientTaskEvent::Error(TaskError {
                key: key.clone(),
                error,
                started_at: started_or_now,
                runtime: runtime.unwrap_or_default(),
            }),
            FutureValue::Pending { .. } | FutureValue::Running { .. } => return,
        };

        metrics::QUEUE_TASKS_ENDED
            .with_label_values(&[outcome.as_str()])
            .inc();
        if let Some(runtime) = runtime {
            metrics::QUEUE_TASK_RUNTIME
                .with_label_values(&[outcome.as_str()])
                .observe(runtime.as_secs_f64());
        }

        debug!("Reporting task {:?}: {}", key, event.event_type());
        self.emit(&event);
        self.emit(&PatientTaskEvent::Finally(TaskFinally {
            key,
            outcome,
            started_at,
            runtime,
        }));
    }
}
