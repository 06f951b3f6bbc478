//! Controllable blocking operations for scheduler tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mediaq_core::scheduler::{DownloadOutput, TaskContext, TaskId};
use tokio::sync::mpsc;

pub const WAIT: Duration = Duration::from_secs(10);

/// Tracks how many held operations are inside their body at once.
#[derive(Default)]
pub struct Occupancy {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl Occupancy {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Release handle for one held operation.
#[derive(Clone, Default)]
pub struct Release(Arc<AtomicBool>);

impl Release {
    pub fn release(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Operation that announces its start, then polls cancellation until released.
pub fn held_op(
    started: mpsc::UnboundedSender<TaskId>,
    release: Release,
    occupancy: Arc<Occupancy>,
) -> impl FnOnce(&mut TaskContext) -> anyhow::Result<DownloadOutput> + Send + 'static {
    move |ctx| {
        occupancy.enter();
        let _ = started.send(ctx.task_id());
        let result = loop {
            if let Err(e) = ctx.checkpoint() {
                break Err(e.into());
            }
            if release.0.load(Ordering::SeqCst) {
                break Ok(DownloadOutput::default());
            }
            std::thread::sleep(Duration::from_millis(5));
        };
        occupancy.leave();
        result
    }
}

/// Receive the next started task id, failing the test after [`WAIT`].
pub async fn next_started(rx: &mut mpsc::UnboundedReceiver<TaskId>) -> TaskId {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("operation did not start in time")
        .expect("started channel closed")
}

/// Poll `cond` until it holds, failing the test after [`WAIT`].
pub async fn eventually(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
