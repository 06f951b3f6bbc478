//! Task record: identity and request metadata, cancel flag, last progress.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant, SystemTime};

use tokio_util::sync::CancellationToken;

use super::progress::ProgressStats;

/// Task identifier, allocated by the scheduler in submission order.
pub type TaskId = u64;

/// Chat-protocol user id of the requester.
pub type UserId = i64;

/// Chat-protocol id of the conversation results are reported to.
pub type ChatId = i64;

/// What the task downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// A link handed to the external extractor.
    Link,
    /// Media attached to the chat message itself.
    InlineMedia,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Link => "link",
            TaskKind::InlineMedia => "inline-media",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable request metadata supplied at submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRequest {
    pub kind: TaskKind,
    /// URL for links, media unique id for inline media.
    pub identifier: String,
    pub requester: UserId,
    pub destination: ChatId,
}

/// One queued or executing download request.
///
/// Shared as `Arc<Task>` between the submitter (via the completion signal),
/// the active registry and the running operation.
#[derive(Debug)]
pub struct Task {
    id: TaskId,
    request: TaskRequest,
    queued_at: SystemTime,
    queued_instant: Instant,
    cancelled: AtomicBool,
    /// Wakes the execution wrapper while it waits for admission.
    cancel_wake: CancellationToken,
    last_progress: Mutex<Option<ProgressStats>>,
}

impl Task {
    pub(crate) fn new(id: TaskId, request: TaskRequest) -> Self {
        Self {
            id,
            request,
            queued_at: SystemTime::now(),
            queued_instant: Instant::now(),
            cancelled: AtomicBool::new(false),
            cancel_wake: CancellationToken::new(),
            last_progress: Mutex::new(None),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn request(&self) -> &TaskRequest {
        &self.request
    }

    pub fn kind(&self) -> TaskKind {
        self.request.kind
    }

    pub fn identifier(&self) -> &str {
        &self.request.identifier
    }

    pub fn requester(&self) -> UserId {
        self.request.requester
    }

    pub fn destination(&self) -> ChatId {
        self.request.destination
    }

    /// Wall-clock submission time.
    pub fn queued_at(&self) -> SystemTime {
        self.queued_at
    }

    /// Time since submission.
    pub fn age(&self) -> Duration {
        self.queued_instant.elapsed()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Request cancellation. Returns true if this call set the flag, false if
    /// it was already set. The flag never reverts.
    pub fn cancel(&self) -> bool {
        let first = !self.cancelled.swap(true, Ordering::AcqRel);
        self.cancel_wake.cancel();
        first
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub(crate) async fn cancelled(&self) {
        self.cancel_wake.cancelled().await;
    }

    /// Most recent progress reported by the running operation.
    pub fn last_progress(&self) -> Option<ProgressStats> {
        self.last_progress
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn record_progress(&self, stats: ProgressStats) {
        *self
            .last_progress
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(stats);
    }
}
