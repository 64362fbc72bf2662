//! Patient task queue: concurrent execution, ordered reporting.

mod error;
mod events;
mod listener;
mod patient;
mod task;

pub use error::QueueError;
pub use events::{
    PatientTaskEvent, TaskAdd, TaskDone, TaskError, TaskFinally, TaskStart, TaskStop, TaskTimeout,
};
pub use listener::PatientTaskListener;
pub use patient::PatientTaskQueue;
pub use task::{BoxError, PatientTask};
