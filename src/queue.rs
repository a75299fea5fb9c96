//! Transfer queue - runs save tasks strictly one at a time, in submission order
//!
//! The worker is started on the first enqueue and exits once the queue drains. A failed
//! (or panicked) task is reported through the feedback channel and the next one starts.

use futures_util::future::BoxFuture;
use log::{debug, error, info};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;

use crate::adapter::SaveLocation;
use crate::error::{BridgeError, SaveError};
use crate::feedback::{Feedback, Severity};

pub type TaskOutcome = Result<SaveLocation, SaveError>;

struct TransferTask {
    label: String,
    run: BoxFuture<'static, TaskOutcome>,
    respond: oneshot::Sender<TaskOutcome>,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<TransferTask>,
    busy: bool,
}

struct Inner {
    state: Mutex<QueueState>,
    feedback: Arc<dyn Feedback>,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Outcome of one enqueued task, available once it ran
pub struct TaskTicket {
    receiver: oneshot::Receiver<TaskOutcome>,
}

impl TaskTicket {
    pub async fn outcome(self) -> TaskOutcome {
        self.receiver.await.unwrap_or_else(|_| {
            Err(SaveError::WriteFailed(BridgeError::Unreachable(
                "transfer queue dropped the task".to_string(),
            )))
        })
    }
}

#[derive(Clone)]
pub struct TransferQueue {
    inner: Arc<Inner>,
}

impl TransferQueue {
    pub fn new(feedback: Arc<dyn Feedback>) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(QueueState::default()),
                feedback,
            }),
        }
    }

    /// Append a task. Must be called from within a tokio runtime.
    pub fn enqueue<F>(&self, label: &str, task: F) -> TaskTicket
    where
        F: Future<Output = TaskOutcome> + Send + 'static,
    {
        let (respond, receiver) = oneshot::channel();
        let start_worker = {
            let mut state = self.inner.state();
            state.pending.push_back(TransferTask {
                label: label.to_string(),
                run: Box::pin(task),
                respond,
            });
            debug!("queue_enqueue: {} pending={}", label, state.pending.len());
            !std::mem::replace(&mut state.busy, true)
        };

        if start_worker {
            tokio::spawn(run_worker(self.inner.clone()));
        }
        TaskTicket { receiver }
    }

    /// Tasks waiting behind the running one
    pub fn pending_len(&self) -> usize {
        self.inner.state().pending.len()
    }

    pub fn is_busy(&self) -> bool {
        self.inner.state().busy
    }
}

async fn run_worker(inner: Arc<Inner>) {
    loop {
        // Pop and clear `busy` under one lock so a concurrent enqueue never gets stranded
        let task = {
            let mut state = inner.state();
            match state.pending.pop_front() {
                Some(task) => task,
                None => {
                    state.busy = false;
                    return;
                }
            }
        };

        let TransferTask {
            label,
            run,
            respond,
        } = task;
        info!("queue_task_start: {}", label);

        let outcome = match tokio::spawn(run).await {
            Ok(outcome) => outcome,
            Err(e) => Err(SaveError::WriteFailed(BridgeError::Unreachable(format!(
                "save task aborted: {}",
                e
            )))),
        };

        match &outcome {
            Ok(location) => info!(
                "queue_task_done: {} saved_name={} location={}",
                label, location.saved_name, location.location_label
            ),
            Err(e) => {
                error!("queue_task_failed: {} error={}", label, e);
                inner
                    .feedback
                    .notify(&format!("Save failed: {}", e), Severity::Error);
            }
        }

        let _ = respond.send(outcome);
    }
}
