//! `mediaq run` – bot loop over stdin/stdout with a control socket.

use anyhow::Result;
use mediaq_core::bot::Dispatcher;
use mediaq_core::config::MediaqConfig;
use mediaq_core::control;
use mediaq_core::scheduler::{ProgressEvent, Scheduler};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::cli::console::{self, ConsoleNotifier};
use crate::cli::{control_socket, progress};

pub async fn run_bot(cfg: MediaqConfig) -> Result<()> {
    cfg.validate()?;
    let (progress_tx, progress_rx) = mpsc::channel::<ProgressEvent>(64);
    let scheduler = Scheduler::from_config(&cfg, Some(progress_tx));
    let progress_handle = progress::spawn_printer(progress_rx);

    let socket_path = control::default_control_socket_path().ok();
    let control_handle = match &socket_path {
        Some(path) => match control_socket::spawn_control_listener(scheduler.clone(), path) {
            Ok(handle) => {
                tracing::debug!(path = %path.display(), "control socket listening");
                Some(handle)
            }
            Err(e) => {
                tracing::warn!("control socket unavailable: {:#}", e);
                None
            }
        },
        None => None,
    };

    let dispatcher = Dispatcher::new(scheduler.clone(), Arc::new(cfg), Arc::new(ConsoleNotifier));
    eprintln!(
        "mediaq ready ({} concurrent downloads); send links, /status, /cancel <id>; EOF to finish",
        scheduler.max_concurrent()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match console::parse_line(&line) {
            Ok(Some(incoming)) => {
                if let Err(e) = dispatcher.handle(incoming).await {
                    tracing::warn!("reply failed: {:#}", e);
                }
            }
            Ok(None) => {}
            Err(e) => eprintln!("ignored input: {:#}", e),
        }
    }

    tracing::info!(status = %scheduler.status(), "input closed, draining queue");
    dispatcher.drain().await;
    scheduler.shutdown().await;

    if let Some(handle) = control_handle {
        handle.abort();
    }
    if let Some(path) = socket_path {
        let _ = std::fs::remove_file(path);
    }
    progress_handle.abort();
    Ok(())
}
