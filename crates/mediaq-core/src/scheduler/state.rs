//! Scheduler bookkeeping guarded by a single lock.
//!
//! Id allocation, the active registry and the outstanding counter all live
//! behind one `Mutex`, so a status snapshot can never see `active` and
//! `total` from different moments.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::status::QueueStatus;
use super::task::{Task, TaskId};

#[derive(Debug)]
struct Counters {
    next_id: TaskId,
    active: HashMap<TaskId, Arc<Task>>,
    outstanding: usize,
}

#[derive(Debug)]
pub(crate) struct SchedulerState {
    inner: Mutex<Counters>,
}

impl SchedulerState {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(Counters {
                next_id: 1,
                active: HashMap::new(),
                outstanding: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Counters> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate the next task id and count the task as outstanding.
    pub(crate) fn admit_submission(&self) -> TaskId {
        let mut c = self.lock();
        let id = c.next_id;
        c.next_id += 1;
        c.outstanding += 1;
        id
    }

    pub(crate) fn insert_active(&self, task: Arc<Task>) {
        self.lock().active.insert(task.id(), task);
    }

    /// Remove from the registry (if present) and decrement the outstanding
    /// counter. Returns the outstanding count afterwards.
    pub(crate) fn finish(&self, id: TaskId) -> usize {
        let mut c = self.lock();
        c.active.remove(&id);
        c.outstanding = c.outstanding.saturating_sub(1);
        c.outstanding
    }

    pub(crate) fn get_active(&self, id: TaskId) -> Option<Arc<Task>> {
        self.lock().active.get(&id).cloned()
    }

    pub(crate) fn active_tasks(&self) -> Vec<Arc<Task>> {
        let mut tasks: Vec<_> = self.lock().active.values().cloned().collect();
        tasks.sort_by_key(|t| t.id());
        tasks
    }

    pub(crate) fn outstanding(&self) -> usize {
        self.lock().outstanding
    }

    pub(crate) fn snapshot(&self, max: usize) -> QueueStatus {
        let c = self.lock();
        QueueStatus::from_counts(c.active.len(), max, c.outstanding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::task::{TaskKind, TaskRequest};

    fn task(id: TaskId) -> Arc<Task> {
        Arc::new(Task::new(
            id,
            TaskRequest {
                kind: TaskKind::Link,
                identifier: format!("https://youtu.be/{id}"),
                requester: 1,
                destination: 1,
            },
        ))
    }

    #[test]
    fn ids_are_monotonic_and_counted() {
        let state = SchedulerState::new();
        assert_eq!(state.admit_submission(), 1);
        assert_eq!(state.admit_submission(), 2);
        assert_eq!(state.admit_submission(), 3);
        assert_eq!(state.outstanding(), 3);
        assert_eq!(state.snapshot(2), QueueStatus::from_counts(0, 2, 3));
    }

    #[test]
    fn finish_removes_and_decrements() {
        let state = SchedulerState::new();
        let id = state.admit_submission();
        state.insert_active(task(id));
        assert!(state.get_active(id).is_some());
        assert_eq!(state.snapshot(1).active, 1);

        assert_eq!(state.finish(id), 0);
        assert!(state.get_active(id).is_none());
        assert_eq!(state.snapshot(1), QueueStatus::from_counts(0, 1, 0));
    }

    #[test]
    fn finish_never_goes_negative() {
        let state = SchedulerState::new();
        assert_eq!(state.finish(99), 0);
        assert_eq!(state.outstanding(), 0);
    }

    #[test]
    fn active_tasks_sorted_by_id() {
        let state = SchedulerState::new();
        for _ in 0..3 {
            state.admit_submission();
        }
        state.insert_active(task(3));
        state.insert_active(task(1));
        let ids: Vec<_> = state.active_tasks().iter().map(|t| t.id()).collect();
        assert_eq!(ids, vec![1, 3]);
    }
}
