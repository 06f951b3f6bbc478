//! Error taxonomy for scheduled download tasks.

use std::fmt;

/// Returned from inside a running operation once its task has been cancelled.
///
/// Operations propagate it with `?`; the execution wrapper recognises it by
/// downcasting and resolves the task as [`TaskError::Cancelled`] instead of a
/// generic failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancellationRequested;

impl fmt::Display for CancellationRequested {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "download cancelled by user")
    }
}

impl std::error::Error for CancellationRequested {}

/// Why a task did not produce a [`DownloadOutput`](crate::scheduler::DownloadOutput).
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The cancel flag was observed, either before admission or by the
    /// operation at one of its progress checkpoints.
    #[error("download cancelled")]
    Cancelled,

    /// The operation returned an error or panicked.
    #[error("download failed: {0:#}")]
    Failed(#[source] anyhow::Error),

    /// The scheduler was shutting down before the task was admitted.
    #[error("scheduler is shutting down")]
    ShutDown,

    /// The wrapper was dropped without resolving (runtime torn down mid-task).
    #[error("download task was abandoned before completion")]
    Abandoned,
}

impl TaskError {
    /// Classify an error returned by a blocking operation.
    pub(crate) fn from_operation(err: anyhow::Error) -> Self {
        if err.downcast_ref::<CancellationRequested>().is_some() {
            TaskError::Cancelled
        } else {
            TaskError::Failed(err)
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn cancellation_marker_is_not_a_failure() {
        let err = anyhow::Error::new(CancellationRequested);
        assert!(TaskError::from_operation(err).is_cancelled());
    }

    #[test]
    fn cancellation_survives_added_context() {
        let err = Err::<(), _>(CancellationRequested)
            .context("copy chunk")
            .unwrap_err();
        assert!(TaskError::from_operation(err).is_cancelled());
    }

    #[test]
    fn other_errors_are_failures_with_cause() {
        let err = anyhow::anyhow!("HTTP 403");
        match TaskError::from_operation(err) {
            TaskError::Failed(cause) => assert_eq!(cause.to_string(), "HTTP 403"),
            other => panic!("expected Failed, got {other:?}"),
        }
    }
}
