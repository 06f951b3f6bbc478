//! Single-assignment completion signal for a submitted task.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::TaskError;

use super::task::{Task, TaskId};

/// What a successful operation produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadOutput {
    /// Files written by the operation, in the order they were finalized.
    pub files: Vec<PathBuf>,
}

impl DownloadOutput {
    pub fn single(path: PathBuf) -> Self {
        Self { files: vec![path] }
    }
}

/// Final result of a task.
pub type TaskOutcome = Result<DownloadOutput, TaskError>;

/// Write side of the completion signal. Consumed on resolve, so a task can
/// only be resolved once.
#[derive(Debug)]
pub(crate) struct Completer {
    tx: oneshot::Sender<TaskOutcome>,
}

impl Completer {
    pub(crate) fn resolve(self, outcome: TaskOutcome) {
        // The submitter may have dropped its signal; nothing to report then.
        let _ = self.tx.send(outcome);
    }
}

/// Read side of the completion signal, returned by `Scheduler::submit`.
///
/// Awaiting it yields the task's outcome. It also keeps a handle on the task
/// itself so the submitter can cancel it while it is still queued.
#[derive(Debug)]
pub struct CompletionSignal {
    task: Arc<Task>,
    rx: oneshot::Receiver<TaskOutcome>,
}

pub(crate) fn completion_pair(task: Arc<Task>) -> (Completer, CompletionSignal) {
    let (tx, rx) = oneshot::channel();
    (Completer { tx }, CompletionSignal { task, rx })
}

impl CompletionSignal {
    pub fn task_id(&self) -> TaskId {
        self.task.id()
    }

    pub fn task(&self) -> &Arc<Task> {
        &self.task
    }

    /// Cancel the task regardless of whether it has been admitted yet.
    pub fn cancel(&self) -> bool {
        self.task.cancel()
    }

    /// Non-blocking check; `None` while the task is still pending.
    pub fn try_outcome(&mut self) -> Option<TaskOutcome> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(TaskError::Abandoned)),
        }
    }
}

impl Future for CompletionSignal {
    type Output = TaskOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.unwrap_or(Err(TaskError::Abandoned)))
    }
}
