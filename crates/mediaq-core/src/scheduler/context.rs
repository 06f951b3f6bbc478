//! Per-task context handed to the blocking operation.
//!
//! The operation reports progress through it and gets `Err(CancellationRequested)`
//! back once its task has been cancelled, which it propagates with `?`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::error::CancellationRequested;

use super::progress::{ProgressEvent, ProgressStats};
use super::task::{Task, TaskId};

/// Explicit per-task state for an operation run.
#[derive(Debug)]
pub struct TaskContext {
    task: Arc<Task>,
    started: Instant,
    progress_tx: Option<mpsc::Sender<ProgressEvent>>,
    progress_interval: Duration,
    last_forwarded: Option<Instant>,
}

impl TaskContext {
    pub(crate) fn new(
        task: Arc<Task>,
        progress_tx: Option<mpsc::Sender<ProgressEvent>>,
        progress_interval: Duration,
    ) -> Self {
        Self {
            task,
            started: Instant::now(),
            progress_tx,
            progress_interval,
            last_forwarded: None,
        }
    }

    /// Context for running an operation outside a scheduler (tests, one-off CLI use).
    pub fn detached(task: Arc<Task>) -> Self {
        Self::new(task, None, Duration::ZERO)
    }

    pub fn task(&self) -> &Arc<Task> {
        &self.task
    }

    pub fn task_id(&self) -> TaskId {
        self.task.id()
    }

    /// Time since the operation started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Cancellation checkpoint without a progress payload.
    pub fn checkpoint(&self) -> Result<(), CancellationRequested> {
        if self.task.is_cancelled() {
            return Err(CancellationRequested);
        }
        Ok(())
    }

    /// Record progress and check for cancellation.
    ///
    /// Progress is stored on the task on every call. It is forwarded on the
    /// progress channel at most once per interval (and always once complete);
    /// a full channel drops the update instead of blocking the download.
    pub fn report(
        &mut self,
        bytes_done: u64,
        total_bytes: Option<u64>,
    ) -> Result<(), CancellationRequested> {
        self.checkpoint()?;

        let stats = ProgressStats {
            bytes_done,
            total_bytes,
            elapsed_secs: self.elapsed().as_secs_f64(),
        };
        self.task.record_progress(stats.clone());

        if let Some(tx) = &self.progress_tx {
            let now = Instant::now();
            let due = self
                .last_forwarded
                .map_or(true, |last| now.duration_since(last) >= self.progress_interval);
            if due || stats.is_complete() {
                let event = ProgressEvent {
                    task_id: self.task.id(),
                    stats,
                };
                if tx.try_send(event).is_ok() {
                    self.last_forwarded = Some(now);
                }
            }
        }
        Ok(())
    }
}
