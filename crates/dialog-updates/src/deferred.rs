//! Deferred choices.
//!
//! Some choice lists are expensive (reading a file, listing a remote
//! directory). They are computed on a worker thread and read once by the
//! request that scheduled them. A holder belongs to one request or session.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, bounded};
use dialog_model::StateComputationFailure;
use serde_json::Value;
use tracing::debug;

use crate::error::DeferredError;

type JobResult = Result<Value, StateComputationFailure>;

enum Slot {
    Pending(Receiver<JobResult>),
    Consumed,
}

/// Per-key, read-once results of background computations.
#[derive(Default)]
pub struct DeferredChoices {
    slots: Mutex<HashMap<String, Slot>>,
}

impl DeferredChoices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `job` on a worker thread under `key`.
    pub fn schedule<F>(&self, key: impl Into<String>, job: F) -> Result<(), DeferredError>
    where
        F: FnOnce() -> JobResult + Send + 'static,
    {
        let key = key.into();
        let mut slots = self.lock();
        if slots.contains_key(&key) {
            return Err(DeferredError::AlreadyScheduled { key });
        }
        let (sender, receiver) = bounded(1);
        let worker_key = key.clone();
        std::thread::spawn(move || {
            let result = job();
            debug!(key = %worker_key, ok = result.is_ok(), "deferred choices ready");
            let _ = sender.send(result);
        });
        slots.insert(key, Slot::Pending(receiver));
        Ok(())
    }

    /// Wait for and consume the result under `key`.
    ///
    /// Fails immediately when the result was already taken, even if that
    /// earlier read is still waiting.
    pub fn take(&self, key: &str) -> Result<JobResult, DeferredError> {
        let receiver = self.claim(key)?;
        receiver.recv().map_err(|_| DeferredError::Disconnected {
            key: key.to_string(),
        })
    }

    /// Like [`take`](Self::take) but gives up after `timeout`. The result is
    /// consumed either way.
    pub fn take_within(&self, key: &str, timeout: Duration) -> Result<JobResult, DeferredError> {
        let receiver = self.claim(key)?;
        receiver.recv_timeout(timeout).map_err(|error| match error {
            RecvTimeoutError::Timeout => DeferredError::Timeout {
                key: key.to_string(),
            },
            RecvTimeoutError::Disconnected => DeferredError::Disconnected {
                key: key.to_string(),
            },
        })
    }

    pub fn is_scheduled(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    fn claim(&self, key: &str) -> Result<Receiver<JobResult>, DeferredError> {
        let mut slots = self.lock();
        let slot = slots.get_mut(key).ok_or_else(|| DeferredError::UnknownKey {
            key: key.to_string(),
        })?;
        match std::mem::replace(slot, Slot::Consumed) {
            Slot::Pending(receiver) => Ok(receiver),
            Slot::Consumed => Err(DeferredError::AlreadyConsumed {
                key: key.to_string(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Slot>> {
        // A panic while holding the lock cannot leave the map inconsistent.
        self.slots
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl std::fmt::Debug for DeferredChoices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredChoices")
            .field("keys", &self.lock().keys().cloned().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn results_are_read_once() {
        let choices = DeferredChoices::new();
        choices.schedule("files", || Ok(json!(["a.csv", "b.csv"]))).unwrap();
        assert_eq!(choices.take("files").unwrap(), Ok(json!(["a.csv", "b.csv"])));
        assert_eq!(
            choices.take("files"),
            Err(DeferredError::AlreadyConsumed {
                key: "files".to_string()
            })
        );
    }

    #[test]
    fn second_read_fails_while_first_waits() {
        let choices = DeferredChoices::new();
        let (release, gate) = bounded::<()>(0);
        choices
            .schedule("slow", move || {
                let _ = gate.recv();
                Ok(json!([]))
            })
            .unwrap();
        assert_eq!(
            choices.take_within("slow", Duration::from_millis(10)),
            Err(DeferredError::Timeout {
                key: "slow".to_string()
            })
        );
        assert!(matches!(
            choices.take("slow"),
            Err(DeferredError::AlreadyConsumed { .. })
        ));
        drop(release);
    }

    #[test]
    fn failures_and_unknown_keys() {
        let choices = DeferredChoices::new();
        choices
            .schedule("broken", || Err(StateComputationFailure::new("no access")))
            .unwrap();
        assert_eq!(
            choices.take("broken").unwrap(),
            Err(StateComputationFailure::new("no access"))
        );
        assert!(matches!(
            choices.schedule("broken", || Ok(Value::Null)),
            Err(DeferredError::AlreadyScheduled { .. })
        ));
        assert!(matches!(choices.take("other"), Err(DeferredError::UnknownKey { .. })));
    }
}
