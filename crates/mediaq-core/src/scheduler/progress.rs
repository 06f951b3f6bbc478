//! Progress reporting for downloads (bytes done, ETA, rate).
//!
//! Operations report `ProgressStats` through their [`TaskContext`](super::TaskContext);
//! the latest value is kept on the task and, when a progress channel is
//! configured, forwarded to the front-end as a [`ProgressEvent`].

use super::task::TaskId;

/// Snapshot of download progress for one task.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressStats {
    /// Bytes received so far.
    pub bytes_done: u64,
    /// Total size in bytes, when the source announced one.
    pub total_bytes: Option<u64>,
    /// Elapsed time since the operation started (seconds).
    pub elapsed_secs: f64,
}

impl ProgressStats {
    /// Download rate in bytes per second (0 if elapsed is 0).
    pub fn bytes_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.bytes_done as f64 / self.elapsed_secs
    }

    /// Estimated seconds remaining (None if total is unknown or rate is 0).
    pub fn eta_secs(&self) -> Option<f64> {
        let total = self.total_bytes?;
        let remaining = total.saturating_sub(self.bytes_done);
        if remaining == 0 {
            return Some(0.0);
        }
        let rate = self.bytes_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(remaining as f64 / rate)
    }

    /// Fraction complete in [0.0, 1.0], if the total is known.
    pub fn fraction(&self) -> Option<f64> {
        let total = self.total_bytes?;
        if total == 0 {
            return Some(1.0);
        }
        Some((self.bytes_done as f64 / total as f64).min(1.0))
    }

    /// Whether every announced byte has arrived.
    pub fn is_complete(&self) -> bool {
        self.total_bytes.is_some_and(|t| self.bytes_done >= t)
    }
}

/// Progress of one task, as sent over the scheduler's progress channel.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub task_id: TaskId,
    pub stats: ProgressStats,
}
