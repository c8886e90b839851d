//! Handle for work finishing on the background context.
//!
//! A `Task` carries exactly one result back to whoever holds it. The holder
//! decides where the result is consumed: `try_take` polls without blocking,
//! `wait` blocks the calling thread. Either way the value is handed over on
//! the holder's own context, never pushed into it from the background.
//!
//! `wait` must not be called from inside an async runtime.

use tokio::runtime::Runtime;
use tokio::sync::oneshot::{self, error::TryRecvError};

#[derive(Debug)]
enum TaskState<T> {
    /// Value available (or already taken / lost when `None`).
    Ready(Option<T>),
    Waiting(oneshot::Receiver<T>),
}

#[derive(Debug)]
pub struct Task<T> {
    state: TaskState<T>,
}

impl<T> Task<T> {
    /// A task that is already complete.
    pub fn ready(value: T) -> Self {
        Self {
            state: TaskState::Ready(Some(value)),
        }
    }

    /// Run `job` on the blocking pool of `runtime`.
    pub(crate) fn spawn_blocking<F>(runtime: &Runtime, job: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        runtime.spawn_blocking(move || {
            // The holder may have dropped the task; nothing to deliver to.
            let _ = tx.send(job());
        });
        Self {
            state: TaskState::Waiting(rx),
        }
    }

    /// True while the background job has neither delivered nor been lost.
    pub fn is_pending(&self) -> bool {
        matches!(self.state, TaskState::Waiting(_))
    }

    /// Take the result if it has arrived.
    ///
    /// Returns `None` while pending, after the value was taken, or when the
    /// background job was dropped without delivering (runtime shut down).
    pub fn try_take(&mut self) -> Option<T> {
        let received = match &mut self.state {
            TaskState::Ready(value) => return value.take(),
            TaskState::Waiting(rx) => rx.try_recv(),
        };
        match received {
            Ok(value) => {
                self.state = TaskState::Ready(None);
                Some(value)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => {
                self.state = TaskState::Ready(None);
                None
            }
        }
    }

    /// Block until the result arrives. `None` if it never will.
    pub fn wait(self) -> Option<T> {
        match self.state {
            TaskState::Ready(value) => value,
            TaskState::Waiting(rx) => rx.blocking_recv().ok(),
        }
    }
}
