//! Listener trait for queue events.

use tokio::sync::mpsc;

use super::events::{
    PatientTaskEvent, TaskAdd, TaskDone, TaskError, TaskFinally, TaskStart, TaskStop, TaskTimeout,
};

/// Receives queue events.
///
/// Every method has a no-op default, so implementors only override what they
/// care about. For each event the typed method is called first, then [`on_any`].
///
/// Listeners are called without any queue lock held and may call back into the
/// queue (`add`, `run`, `stop`, `remove`). A nested `roll_forward` is ignored.
///
/// [`on_any`]: PatientTaskListener::on_any
pub trait PatientTaskListener<K, V>: Send + Sync {
    /// Called for every event.
    fn on_any(&self, _event: &PatientTaskEvent<K, V>) {}

    fn on_add(&self, _event: &TaskAdd<K>) {}

    fn on_start(&self, _event: &TaskStart<K>) {}

    fn on_stop(&self, _event: &TaskStop<K>) {}

    fn on_done(&self, _event: &TaskDone<K, V>) {}

    fn on_timeout(&self, _event: &TaskTimeout<K>) {}

    fn on_error(&self, _event: &TaskError<K>) {}

    /// Called after the terminal event of a task, whatever the outcome.
    fn on_finally(&self, _event: &TaskFinally<K>) {}
}

/// Forwards every event into a channel.
impl<K, V> PatientTaskListener<K, V> for mpsc::UnboundedSender<PatientTaskEvent<K, V>>
where
    K: Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn on_any(&self, event: &PatientTaskEvent<K, V>) {
        if self.send(event.clone()).is_err() {
            tracing::debug!("Event receiver dropped, discarding {}", event.event_type());
        }
    }
}

/// Calls the typed method, then `on_any`.
pub(crate) fn dispatch<K, V>(listener: &dyn PatientTaskListener<K, V>, event: &PatientTaskEvent<K, V>) {
    match event {
        PatientTaskEvent::Add(e) => listener.on_add(e),
        PatientTaskEvent::Start(e) => listener.on_start(e),
        PatientTaskEvent::Stop(e) => listener.on_stop(e),
        PatientTaskEvent::Done(e) => listener.on_done(e),
        PatientTaskEvent::Timeout(e) => listener.on_timeout(e),
        PatientTaskEvent::Error(e) => listener.on_error(e),
        PatientTaskEvent::Finally(e) => listener.on_finally(e),
    }
    listener.on_any(event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<&'static str>>,
    }

    impl PatientTaskListener<u32, ()> for Recorder {
        fn on_any(&self, _event: &PatientTaskEvent<u32, ()>) {
            self.calls.lock().unwrap().push("any");
        }

        fn on_add(&self, _event: &TaskAdd<u32>) {
            self.calls.lock().unwrap().push("add");
        }
    }

    #[test]
    fn test_typed_before_any() {
        let recorder = Recorder::default();
        dispatch(&recorder, &PatientTaskEvent::Add(TaskAdd { key: 1 }));
        assert_eq!(*recorder.calls.lock().unwrap(), vec!["add", "any"]);
    }

    #[test]
    fn test_channel_listener_forwards() {
        let (tx, mut rx) = mpsc::unbounded_channel::<PatientTaskEvent<u32, ()>>();
        dispatch(&tx, &PatientTaskEvent::Add(TaskAdd { key: 9 }));
        let ev = rx.try_recv().expect("Should receive event");
        assert_eq!(*ev.key(), 9);
    }

    #[test]
    fn test_channel_listener_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel::<PatientTaskEvent<u32, ()>>();
        drop(rx);
        // Should not panic
        dispatch(&tx, &PatientTaskEvent::Add(TaskAdd { key: 9 }));
    }
}
