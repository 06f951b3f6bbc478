//! RAII guard that performs a task's scheduler cleanup when dropped.

use std::sync::Arc;

use super::gate::GatePermit;
use super::task::TaskId;
use super::Shared;

/// Removes the task from the registry, releases its permit (if it got one)
/// and decrements the outstanding counter. Runs once, on drop, however the
/// wrapper exits.
pub(super) struct TaskGuard {
    pub(super) shared: Arc<Shared>,
    pub(super) id: TaskId,
    pub(super) permit: Option<GatePermit>,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        let remaining = self.shared.state.finish(self.id);
        // Registry entry is gone before the slot is handed to the next waiter.
        drop(self.permit.take());
        if remaining == 0 {
            self.shared.idle.notify_waiters();
        }
        tracing::debug!(task_id = self.id, outstanding = remaining, "task cleaned up");
    }
}
