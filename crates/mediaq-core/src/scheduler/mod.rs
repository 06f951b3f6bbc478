//! Bounded-concurrency download scheduler.
//!
//! Accepts download requests, admits at most `max_concurrent` of them at a
//! time through a [`ConcurrencyGate`], runs each admitted operation on the
//! blocking pool and resolves a [`CompletionSignal`] per task. Cancellation is
//! cooperative: the running operation observes it through its [`TaskContext`].
//!
//! Task lifecycle: `Queued -> Admitted -> {Succeeded | Failed | Cancelled}`,
//! with `Queued -> Cancelled` and `Queued -> ShutDown` for tasks that never
//! got a permit.

mod completion;
mod context;
mod execute;
mod gate;
mod guard;
mod progress;
mod state;
mod status;
mod task;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Notify};

pub use completion::{CompletionSignal, DownloadOutput, TaskOutcome};
pub use context::TaskContext;
pub use gate::{ConcurrencyGate, GateClosed, GatePermit};
pub use progress::{ProgressEvent, ProgressStats};
pub use status::QueueStatus;
pub use task::{ChatId, Task, TaskId, TaskKind, TaskRequest, UserId};

use crate::config::MediaqConfig;

use self::execute::{execute_task, BoxedOperation};
use self::state::SchedulerState;

/// State shared by the scheduler handle and every running wrapper.
pub(crate) struct Shared {
    gate: ConcurrencyGate,
    state: SchedulerState,
    /// Notified when the outstanding count drops to zero.
    idle: Notify,
    closing: AtomicBool,
    progress_tx: Option<mpsc::Sender<ProgressEvent>>,
    progress_interval: Duration,
}

impl Shared {
    fn status(&self) -> QueueStatus {
        self.state.snapshot(self.gate.capacity())
    }

    fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }
}

/// Handle to a scheduler. Cheap to clone; all clones share the same queue.
///
/// Construct one at startup and pass it to every call site that submits or
/// inspects downloads.
#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("status", &self.status())
            .field("closing", &self.shared.is_closing())
            .finish()
    }
}

impl Scheduler {
    /// Scheduler admitting at most `max_concurrent` downloads, without a progress channel.
    pub fn new(max_concurrent: usize) -> Self {
        Self::build(max_concurrent, None, Duration::ZERO)
    }

    /// Scheduler that forwards throttled progress of running tasks to `progress_tx`.
    pub fn with_progress(
        max_concurrent: usize,
        progress_tx: mpsc::Sender<ProgressEvent>,
        progress_interval: Duration,
    ) -> Self {
        Self::build(max_concurrent, Some(progress_tx), progress_interval)
    }

    /// Scheduler sized and throttled from configuration.
    pub fn from_config(cfg: &MediaqConfig, progress_tx: Option<mpsc::Sender<ProgressEvent>>) -> Self {
        Self::build(cfg.max_concurrent_downloads, progress_tx, cfg.progress_interval())
    }

    fn build(
        max_concurrent: usize,
        progress_tx: Option<mpsc::Sender<ProgressEvent>>,
        progress_interval: Duration,
    ) -> Self {
        let gate = ConcurrencyGate::new(max_concurrent);
        tracing::info!(max_concurrent = gate.capacity(), "scheduler initialized");
        Self {
            shared: Arc::new(Shared {
                gate,
                state: SchedulerState::new(),
                idle: Notify::new(),
                closing: AtomicBool::new(false),
                progress_tx,
                progress_interval,
            }),
        }
    }

    /// Queue a blocking download operation.
    ///
    /// Returns immediately with the allocated task id and the task's
    /// completion signal; execution proceeds on a detached task. The
    /// outstanding count is incremented before this returns.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn submit<F>(
        &self,
        operation: F,
        kind: TaskKind,
        identifier: impl Into<String>,
        requester: UserId,
        destination: ChatId,
    ) -> (TaskId, CompletionSignal)
    where
        F: FnOnce(&mut TaskContext) -> anyhow::Result<DownloadOutput> + Send + 'static,
    {
        let id = self.shared.state.admit_submission();
        let task = Arc::new(Task::new(
            id,
            TaskRequest {
                kind,
                identifier: identifier.into(),
                requester,
                destination,
            },
        ));
        let (completer, signal) = completion::completion_pair(Arc::clone(&task));

        let status = self.status();
        tracing::info!(
            task_id = id,
            kind = %kind,
            requester,
            queue_position = status.total,
            "download queued"
        );

        let operation: BoxedOperation = Box::new(operation);
        tokio::spawn(execute_task(
            Arc::clone(&self.shared),
            task,
            operation,
            completer,
        ));

        (id, signal)
    }

    /// Consistent snapshot of the queue counters.
    pub fn status(&self) -> QueueStatus {
        self.shared.status()
    }

    /// Look up a task currently holding a permit. Queued and finished tasks
    /// are not found.
    pub fn get_task(&self, id: TaskId) -> Option<Arc<Task>> {
        self.shared.state.get_active(id)
    }

    /// Tasks currently holding a permit, ordered by id.
    pub fn active_tasks(&self) -> Vec<Arc<Task>> {
        self.shared.state.active_tasks()
    }

    /// Request cancellation of an active task. Returns whether the task was
    /// found; the running operation stops at its next checkpoint.
    pub fn cancel_task(&self, id: TaskId) -> bool {
        match self.shared.state.get_active(id) {
            Some(task) => {
                if task.cancel() {
                    tracing::info!(task_id = id, "cancellation requested");
                }
                true
            }
            None => {
                tracing::debug!(task_id = id, "cancel: task not active");
                false
            }
        }
    }

    /// Gate capacity.
    pub fn max_concurrent(&self) -> usize {
        self.shared.gate.capacity()
    }

    /// Wait until no submitted task is outstanding.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.shared.state.outstanding() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Stop admitting tasks and wait for active downloads to finish.
    ///
    /// Tasks still waiting for a permit resolve with `TaskError::ShutDown`;
    /// so do tasks submitted afterwards.
    pub async fn shutdown(&self) {
        if !self.shared.closing.swap(true, Ordering::AcqRel) {
            tracing::info!(status = %self.status(), "scheduler shutting down");
        }
        self.shared.gate.close();
        self.wait_idle().await;
        tracing::info!("scheduler drained");
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shared.is_closing()
    }
}
