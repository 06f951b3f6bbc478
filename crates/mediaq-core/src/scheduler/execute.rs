//! Execution wrapper: admission, blocking run, outcome, cleanup.

use std::sync::Arc;

use crate::error::TaskError;

use super::completion::{Completer, DownloadOutput, TaskOutcome};
use super::context::TaskContext;
use super::guard::TaskGuard;
use super::task::Task;
use super::Shared;

/// Blocking download operation as accepted by `Scheduler::submit`.
pub(super) type BoxedOperation =
    Box<dyn FnOnce(&mut TaskContext) -> anyhow::Result<DownloadOutput> + Send + 'static>;

/// Drives one task from queued to resolved. Spawned detached by `submit`.
///
/// Cleanup happens in `TaskGuard::drop` before the completion signal is
/// resolved, so whoever awaits the signal sees the registry and counters
/// already updated.
pub(super) async fn execute_task(
    shared: Arc<Shared>,
    task: Arc<Task>,
    operation: BoxedOperation,
    completer: Completer,
) {
    let mut guard = TaskGuard {
        shared: Arc::clone(&shared),
        id: task.id(),
        permit: None,
    };

    let outcome = admit_and_run(&shared, &task, operation, &mut guard).await;
    log_outcome(&task, &outcome);

    drop(guard);
    completer.resolve(outcome);
}

async fn admit_and_run(
    shared: &Shared,
    task: &Arc<Task>,
    operation: BoxedOperation,
    guard: &mut TaskGuard,
) -> TaskOutcome {
    let permit = tokio::select! {
        biased;
        () = task.cancelled() => {
            tracing::debug!(task_id = task.id(), "cancelled while queued");
            return Err(TaskError::Cancelled);
        }
        acquired = shared.gate.acquire() => match acquired {
            Ok(permit) => permit,
            Err(_) => return Err(TaskError::ShutDown),
        },
    };
    guard.permit = Some(permit);

    if task.is_cancelled() {
        tracing::debug!(task_id = task.id(), "cancelled before start");
        return Err(TaskError::Cancelled);
    }
    if shared.is_closing() {
        return Err(TaskError::ShutDown);
    }

    shared.state.insert_active(Arc::clone(task));
    let status = shared.status();
    tracing::info!(
        task_id = task.id(),
        kind = %task.kind(),
        active = status.active,
        max = status.max,
        waited_ms = task.age().as_millis() as u64,
        "download started"
    );

    let mut ctx = TaskContext::new(
        Arc::clone(task),
        shared.progress_tx.clone(),
        shared.progress_interval,
    );
    let joined = tokio::task::spawn_blocking(move || operation(&mut ctx)).await;

    match joined {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(err)) => Err(TaskError::from_operation(err)),
        Err(join_err) => Err(TaskError::Failed(anyhow::anyhow!(
            "download operation panicked: {}",
            join_err
        ))),
    }
}

fn log_outcome(task: &Task, outcome: &TaskOutcome) {
    match outcome {
        Ok(output) => tracing::info!(
            task_id = task.id(),
            files = output.files.len(),
            elapsed_ms = task.age().as_millis() as u64,
            "download completed"
        ),
        Err(TaskError::Cancelled) => tracing::info!(task_id = task.id(), "download cancelled"),
        Err(TaskError::ShutDown) => {
            tracing::info!(task_id = task.id(), "download dropped at shutdown")
        }
        Err(e) => tracing::warn!(task_id = task.id(), identifier = task.identifier(), "{:#}", e),
    }
}
