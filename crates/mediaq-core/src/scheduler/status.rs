//! Point-in-time queue snapshot for display.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Queue counters as shown to chat users and over the control socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    /// Tasks currently holding a gate permit.
    pub active: usize,
    /// Gate capacity.
    pub max: usize,
    /// Submitted tasks not yet admitted (`total - active`, floored at 0).
    pub waiting: usize,
    /// Submitted tasks that have not finished yet.
    pub total: usize,
}

impl QueueStatus {
    pub(crate) fn from_counts(active: usize, max: usize, total: usize) -> Self {
        Self {
            active,
            max,
            waiting: total.saturating_sub(active),
            total,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.total == 0
    }

    /// Whether a newly submitted task would have to wait for a slot.
    pub fn is_saturated(&self) -> bool {
        self.active >= self.max
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} active, {} waiting",
            self.active, self.max, self.waiting
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waiting_is_total_minus_active() {
        let s = QueueStatus::from_counts(2, 2, 3);
        assert_eq!(s.waiting, 1);
        assert!(s.is_saturated());
        assert!(!s.is_idle());
    }

    #[test]
    fn waiting_never_negative() {
        let s = QueueStatus::from_counts(2, 3, 1);
        assert_eq!(s.waiting, 0);
    }

    #[test]
    fn display_and_json() {
        let s = QueueStatus::from_counts(1, 3, 4);
        assert_eq!(s.to_string(), "1/3 active, 3 waiting");
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, r#"{"active":1,"max":3,"waiting":3,"total":4}"#);
        let back: QueueStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn idle_when_nothing_outstanding() {
        assert!(QueueStatus::from_counts(0, 3, 0).is_idle());
    }
}
